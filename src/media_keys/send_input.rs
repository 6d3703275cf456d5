//! Virtual media keys through `SendInput`

use anyhow::Result;
use async_trait::async_trait;
use std::mem::size_of;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP, SendInput,
    VIRTUAL_KEY, VK_MEDIA_NEXT_TRACK, VK_MEDIA_PLAY_PAUSE, VK_MEDIA_PREV_TRACK,
};

use super::{MediaKeys, TransportCommand};

pub struct SendInputKeys;

fn key_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

#[async_trait]
impl MediaKeys for SendInputKeys {
    fn name(&self) -> &'static str {
        "SendInput"
    }

    async fn send(&self, command: TransportCommand) -> Result<()> {
        let vk = match command {
            TransportCommand::PlayPause => VK_MEDIA_PLAY_PAUSE,
            TransportCommand::Next => VK_MEDIA_NEXT_TRACK,
            TransportCommand::Previous => VK_MEDIA_PREV_TRACK,
        };
        let inputs = [
            key_input(vk, KEYBD_EVENT_FLAGS(0)),
            key_input(vk, KEYEVENTF_KEYUP),
        ];

        // Number of events actually inserted; anything short means input was blocked
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            anyhow::bail!("SendInput inserted {} of {} events", sent, inputs.len());
        }
        Ok(())
    }
}
