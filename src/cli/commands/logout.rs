//! Logout command implementation.

use crate::models::session::SessionStore;
use crate::Result;
use colored::Colorize;

/// Forget the saved session for a server.
pub async fn logout(server: &str) -> Result<()> {
    let path = SessionStore::default_path();
    let mut store = SessionStore::load(&path);

    match store.remove(server) {
        Some(_) => {
            store.save(&path)?;
            println!("{} Signed out of {}", "[OK]".green(), server);
        }
        None => println!("No saved session for {}", server),
    }
    Ok(())
}
