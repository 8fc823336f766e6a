//! Operator tool: run migrations and manage staff accounts without the API.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use najd_api::{
    config,
    db::{self, DbConfig, DbPool},
    entities::user::UserRole,
    services::users::{CreateUserRequest, UserFilter, UserService},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "najd-admin", about = "Najd administration commands", version)]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a staff account
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Replace a user's password
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// List staff accounts
    ListUsers {
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Ceo,
    Accountant,
    Sales,
    Designer,
    Printing,
    Inventory,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Ceo => UserRole::Ceo,
            RoleArg::Accountant => UserRole::Accountant,
            RoleArg::Sales => UserRole::Sales,
            RoleArg::Designer => UserRole::Designer,
            RoleArg::Printing => UserRole::Printing,
            RoleArg::Inventory => UserRole::Inventory,
        }
    }
}

async fn connect(database_url: Option<String>) -> Result<DbPool> {
    let db_cfg = match database_url {
        Some(url) => DbConfig {
            url,
            ..DbConfig::default()
        },
        None => {
            let cfg = config::load_config().context("failed to load configuration")?;
            DbConfig::from(&cfg)
        }
    };
    db::establish_connection_with_config(&db_cfg)
        .await
        .context("failed to connect to the database")
}

async fn find_user_id(users: &UserService, email: &str) -> Result<uuid::Uuid> {
    let filter = UserFilter {
        search: Some(email.to_string()),
        ..UserFilter::default()
    };
    let page = users.list_users(filter, 1, 50).await?;
    page.items
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
        .map(|u| u.id)
        .with_context(|| format!("no user with email {email}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("warn", false);

    let pool = connect(cli.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&pool).await?;
            println!("Migrations applied");
        }
        Commands::CreateUser {
            name,
            email,
            password,
            role,
            phone,
        } => {
            let users = UserService::new(Arc::new(pool));
            let user = users
                .create_user(CreateUserRequest {
                    name,
                    email,
                    password,
                    role: role.into(),
                    department: None,
                    phone,
                })
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("Created {} <{}> as {} (id {})", user.name, user.email, user.role, user.id);
            }
        }
        Commands::ResetPassword { email, password } => {
            let users = UserService::new(Arc::new(pool));
            let id = find_user_id(&users, &email).await?;
            users.reset_password(id, &password).await?;
            println!("Password replaced for {email}");
        }
        Commands::ListUsers { role, search } => {
            let users = UserService::new(Arc::new(pool));
            let filter = UserFilter {
                role: role.map(UserRole::from),
                active: None,
                search,
            };
            let page = users.list_users(filter, 1, 500).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&page.items)?);
            } else {
                for user in &page.items {
                    println!(
                        "{}  {:<28} {:<11} {:<11} {}",
                        user.id,
                        user.email,
                        user.role,
                        user.department,
                        if user.active { "active" } else { "disabled" }
                    );
                }
                println!("{} user(s)", page.total);
            }
        }
    }

    Ok(())
}
