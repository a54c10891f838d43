//! Intensity control: nudge the shared brightness scalar from the terminal.
//!
//! Right arrow (`ESC [ C`) raises it by one, left arrow (`ESC [ D`) lowers
//! it by one; `q` or end of input quits.

use std::io::{Read, Write};
use std::sync::atomic::Ordering;

use ambilight::config::AmbilightConfig;
use ambilight_shm::SharedChannel;
use tracing::warn;

use super::{open_channel, setup_interrupt_handler, CommandResult};
use crate::cli::ChannelArgs;

pub fn run(
    mut config: AmbilightConfig,
    args: &ChannelArgs,
    delta: Option<i32>,
    set: Option<u16>,
) -> CommandResult {
    let mut channel = open_channel(&mut config, args)?;

    let result = match (set, delta) {
        (Some(value), _) => channel.set_intensity(value).map(|v| {
            println!("Intensity: {v}");
        }),
        (None, Some(delta)) => channel.adjust_intensity(delta).map(|v| {
            println!("Intensity: {v}");
        }),
        (None, None) => return interactive(channel),
    };

    channel.close()?;
    Ok(result?)
}

fn interactive(mut channel: SharedChannel) -> CommandResult {
    let running = setup_interrupt_handler()?;
    let terminal = TerminalMode::enter();
    if terminal.is_none() {
        warn!("stdin is not a terminal; reading keys without raw mode");
    }

    let mut stdout = std::io::stdout();
    let mut value = channel.read_intensity()?;
    println!("Left/Right arrows adjust intensity, q quits");
    print!("\rIntensity: {value:3}");
    stdout.flush()?;

    let mut decoder = ArrowDecoder::default();
    let mut stdin = std::io::stdin();
    let mut buf = [0u8; 32];
    'keys: while running.load(Ordering::SeqCst) {
        let n = match stdin.read(&mut buf) {
            // With a terminal in timed mode, 0 means no key within the timeout
            Ok(0) if terminal.is_some() => continue,
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        for &byte in &buf[..n] {
            let step = match decoder.push(byte) {
                Some(Key::Increase) => 1,
                Some(Key::Decrease) => -1,
                Some(Key::Quit) => break 'keys,
                None => continue,
            };
            value = channel.adjust_intensity(step)?;
            print!("\rIntensity: {value:3}");
            stdout.flush()?;
        }
    }
    println!();

    drop(terminal);
    channel.close()?;
    Ok(())
}

/// Decoded control key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Increase,
    Decrease,
    Quit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Ground,
    Escape,
    Csi,
    CsiParams,
}

/// Byte-at-a-time decoder for arrow key escape sequences
#[derive(Debug, Default)]
pub struct ArrowDecoder {
    state: DecodeState,
}

impl ArrowDecoder {
    pub fn push(&mut self, byte: u8) -> Option<Key> {
        match (self.state, byte) {
            (_, 0x1b) => {
                self.state = DecodeState::Escape;
                None
            }
            (DecodeState::Ground, b'q' | b'Q') => Some(Key::Quit),
            (DecodeState::Ground, _) => None,
            (DecodeState::Escape, b'[') => {
                self.state = DecodeState::Csi;
                None
            }
            (DecodeState::Escape, _) => {
                self.state = DecodeState::Ground;
                None
            }
            (DecodeState::Csi, b'C') => {
                self.state = DecodeState::Ground;
                Some(Key::Increase)
            }
            (DecodeState::Csi, b'D') => {
                self.state = DecodeState::Ground;
                Some(Key::Decrease)
            }
            // Modified arrows and other sequences carry parameters
            (DecodeState::Csi | DecodeState::CsiParams, 0x20..=0x3f) => {
                self.state = DecodeState::CsiParams;
                None
            }
            (DecodeState::Csi | DecodeState::CsiParams, 0x40..=0x7e) => {
                self.state = DecodeState::Ground;
                None
            }
            (DecodeState::Csi | DecodeState::CsiParams, _) => {
                self.state = DecodeState::Ground;
                None
            }
        }
    }
}

/// Non-canonical, no-echo terminal for the session; restored on drop
struct TerminalMode {
    old_termios: libc::termios,
}

impl TerminalMode {
    /// `None` if stdin is not a terminal
    fn enter() -> Option<Self> {
        use std::os::unix::io::AsRawFd;

        let fd = std::io::stdin().as_raw_fd();
        let mut old_termios: libc::termios = unsafe { std::mem::zeroed() };

        // Get current terminal settings
        if unsafe { libc::tcgetattr(fd, &mut old_termios) } != 0 {
            return None;
        }

        // Non-canonical, no echo; reads return after 100 ms so Ctrl+C is seen
        let mut new_termios = old_termios;
        new_termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        new_termios.c_cc[libc::VMIN] = 0;
        new_termios.c_cc[libc::VTIME] = 1;

        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &new_termios) } != 0 {
            return None;
        }

        Some(Self { old_termios })
    }
}

impl Drop for TerminalMode {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let fd = std::io::stdin().as_raw_fd();
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.old_termios);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Key> {
        let mut d = ArrowDecoder::default();
        bytes.iter().filter_map(|&b| d.push(b)).collect()
    }

    #[test]
    fn test_arrows() {
        assert_eq!(decode(b"\x1b[C\x1b[C\x1b[D"), vec![Key::Increase, Key::Increase, Key::Decrease]);
    }

    #[test]
    fn test_other_keys_ignored() {
        // Up/down arrows, plain letters, a modified arrow
        assert_eq!(decode(b"\x1b[A\x1b[Bxyz\x1b[1;5C"), vec![]);
        // Letters inside a sequence are not a quit
        assert_eq!(decode(b"\x1b[q"), vec![]);
    }

    #[test]
    fn test_quit() {
        assert_eq!(decode(b"\x1b[Cq"), vec![Key::Increase, Key::Quit]);
    }

    #[test]
    fn test_sequence_split_across_reads() {
        let mut d = ArrowDecoder::default();
        assert_eq!(d.push(0x1b), None);
        assert_eq!(d.push(b'['), None);
        assert_eq!(d.push(b'D'), Some(Key::Decrease));
    }

    #[test]
    fn test_escape_restarts_sequence() {
        assert_eq!(decode(b"\x1b\x1b[C"), vec![Key::Increase]);
    }
}
