//! Print the bcrypt hash of a password, for seeding accounts by hand.
//!
//! Usage: `hash-password [password] [rounds]`

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let password = args.next().unwrap_or_else(|| "change_me".to_string());
    let rounds = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("invalid rounds '{}': {}", raw, e))?,
        None => 10,
    };

    let hash = bcrypt::hash(&password, rounds)?;
    println!("password: {}", password);
    println!("bcrypt hash: {}", hash);
    Ok(())
}
