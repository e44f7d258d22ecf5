//! Simple CLI commands: normalize

use idrecon::{normalize_str, Result};

/// Print `name -> KEY` for each name; a blank name has the empty key.
pub fn cmd_normalize(names: &[String]) -> Result<()> {
    for name in names {
        let key = normalize_str(name);
        if key.is_empty() {
            println!("{:?} -> (empty)", name);
        } else {
            println!("{} -> {}", name, key);
        }
    }
    Ok(())
}
