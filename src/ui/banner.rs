// Thu Jan 22 2026 - Alex

use colored::*;

const TITLE: &str = "Dump Reloc Rebuilder";
const TAGLINE: &str = "relocs + imports from differential dumps";

/// Startup header: tool name, what it recovers, crate version.
pub struct Banner {
    use_color: bool,
}

impl Banner {
    pub fn new() -> Self {
        Self { use_color: true }
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn render(&self) -> String {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let width = TITLE.len().max(TAGLINE.len()) + version.len() + 3;
        let rule = "=".repeat(width);

        let title = format!("{} {}", TITLE, version);
        let (rule, title, tagline) = if self.use_color {
            (
                rule.cyan().to_string(),
                title.cyan().bold().to_string(),
                TAGLINE.dimmed().to_string(),
            )
        } else {
            (rule, title, TAGLINE.to_string())
        };

        format!("{}\n {}\n {}\n{}", rule, title, tagline, rule)
    }

    pub fn print(&self) {
        println!("{}", self.render());
        println!();
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::new()
    }
}
