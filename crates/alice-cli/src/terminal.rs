//! Terminal console backed by stdin/stdout

use std::io::Write;

use alice_core::session::Console;
use alice_core::Result;
use async_trait::async_trait;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct TerminalConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        // The menu arrives as one multi-line prompt; only the last line is the prompt proper
        match text.rsplit_once('\n') {
            Some((menu, prompt)) => {
                println!("{}", menu);
                print!("{}", style(prompt).bold());
            }
            None => print!("{}", style(text).bold()),
        }
        std::io::stdout().flush()?;

        Ok(self.lines.next_line().await?)
    }

    fn status(&mut self, text: &str) {
        println!("\n{} {}", style("#").cyan().bold(), style(text).bold());
    }

    fn message(&mut self, text: &str) {
        println!("{}", text);
    }

    fn error(&mut self, text: &str) {
        eprintln!("{}", style(text).red());
    }
}
