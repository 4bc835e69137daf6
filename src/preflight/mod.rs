//! Checks run before a fetch: the server answers and the destination is
//! writable.

mod dest;
mod server;

use colored::Colorize;
use std::path::Path;

/// Outcome of one check.
#[derive(Debug)]
pub enum Check {
    Passed(String),
    Failed { reason: String, hint: &'static str },
}

impl Check {
    pub fn is_passed(&self) -> bool {
        matches!(self, Check::Passed(_))
    }

    fn print(&self, label: &str) {
        match self {
            Check::Passed(status) => println!("{} {}: {}", "[OK]".green(), label.bold(), status),
            Check::Failed { reason, hint } => {
                println!("{} {}: {}", "[FAIL]".red(), label.bold(), reason);
                println!("  {} {}", "->".yellow(), hint);
            }
        }
    }
}

/// Server and destination checks for one fetch.
#[derive(Debug)]
pub struct Preflight {
    pub server: Check,
    pub dest: Check,
}

impl Preflight {
    /// Run both checks concurrently.
    pub async fn run(server_url: &str, dest_dir: &Path) -> Self {
        let (server, dest) = tokio::join!(server::check(server_url), dest::check(dest_dir));
        Self { server, dest }
    }

    pub fn passed(&self) -> bool {
        self.server.is_passed() && self.dest.is_passed()
    }

    pub fn print(&self) {
        self.server.print("Server");
        self.dest.print("Destination");
    }
}
