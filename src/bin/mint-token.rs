//! Mint a signed token from the server's configuration.
//! Typical use: bootstrap the first API key before any admin can sign in.
//!
//! Usage: mint-token --kind apikey [--env .env]
//!        mint-token --kind access --user-id <ID> --role admin

use clap::Parser;

use shop_api::{
    config::Config,
    models::{
        auth::{TokenKind, UserClaims},
        user::UserRole,
    },
    services::token::TokenService,
};

#[derive(Parser)]
#[command(name = "mint-token", about = "Sign a shop-api token with the configured secrets")]
struct Args {
    /// Token kind: access, refresh, admin or apikey
    #[arg(long)]
    kind: String,

    /// User id embedded in access and refresh tokens
    #[arg(long)]
    user_id: Option<String>,

    /// Role embedded in access and refresh tokens
    #[arg(long, default_value = "customer")]
    role: String,

    /// Env file to load before reading the configuration
    #[arg(long, default_value = ".env")]
    env: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = dotenvy::from_path(&args.env) {
        tracing::warn!("could not load {}: {}", args.env, e);
    }

    let config = Config::from_env()?;
    let kind: TokenKind = args.kind.parse()?;

    let claims = match (kind.carries_user_claims(), args.user_id) {
        (true, Some(id)) => Some(UserClaims {
            id,
            role: args.role.parse::<UserRole>()?,
        }),
        (true, None) => anyhow::bail!("--user-id is required for {kind} tokens"),
        (false, _) => None,
    };

    let token = TokenService::issue(kind, &config.jwt, claims.as_ref())?;
    println!("{token}");
    Ok(())
}
