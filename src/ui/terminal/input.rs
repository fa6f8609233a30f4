// Thu Jan 22 2026 - Alex

use std::io::{self, BufRead, Write};

/// Line-based prompts over any reader/writer pair, stdin/stdout by default.
pub struct TerminalInput<R, W> {
    reader: R,
    writer: W,
}

impl TerminalInput<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Prints `message` and reads one trimmed line. End of input is an
    /// `UnexpectedEof` error.
    pub fn prompt(&mut self, message: &str) -> io::Result<String> {
        write!(self.writer, "{}", message)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Repeats until the answer is a single `y` or `n`, any case.
    pub fn prompt_yes_no(&mut self, message: &str) -> io::Result<bool> {
        loop {
            let input = self.prompt(message)?;
            match input.to_ascii_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => continue,
            }
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> TerminalInput<&[u8], Vec<u8>> {
        TerminalInput::new(text.as_bytes(), Vec::new())
    }

    #[test]
    fn test_prompt_trims_and_echoes_message() {
        let mut term = input("  C:\\dumps\\a \r\n");
        assert_eq!(term.prompt("Folder: ").unwrap(), "C:\\dumps\\a");
        assert_eq!(term.writer().as_slice(), b"Folder: ");
    }

    #[test]
    fn test_yes_no_retries_until_valid() {
        let mut term = input("maybe\nyes\nN\n");
        assert!(!term.prompt_yes_no("Add? ").unwrap());
        assert_eq!(String::from_utf8_lossy(term.writer()).matches("Add? ").count(), 3);
    }

    #[test]
    fn test_eof_is_an_error() {
        let mut term = input("");
        let err = term.prompt("x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
