//! Line buffer for the TTY output the BIOS writes through the expansion 2 debug UART.

use log::info;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tty {
    line: String,
}

impl Tty {
    pub fn new() -> Tty {
        Tty {
            line: String::new(),
        }
    }

    /// Accumulate one byte of output. Lines are flushed to the log on newline, carriage returns
    /// are dropped.
    pub fn push_byte(&mut self, b: u8) {
        match b {
            b'\r' => (),
            b'\n' => {
                if !self.line.is_empty() {
                    info!("TTY: {}", self.line);
                }
                self.line.clear();
            }
            _ => self.line.push(char::from(b)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Tty;

    #[test]
    fn newline_flushes_the_line() {
        let mut tty = Tty::new();

        for &b in b"hello\r\n" {
            tty.push_byte(b);
        }

        assert!(tty.is_empty());
    }

    #[test]
    fn carriage_return_is_dropped() {
        let mut tty = Tty::new();

        tty.push_byte(b'\r');

        assert!(tty.is_empty());
    }
}
