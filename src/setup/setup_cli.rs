use clap::{Parser, Subcommand};
use quillbase_backend::config::Config;
use quillbase_backend::models::db_operations::users_db_operations;
use quillbase_backend::setup::db_setup;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial blog setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Author {
        #[command(subcommand)]
        action: AuthorAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum AuthorAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_blog_database(&config),
        },
        Commands::Author { action } => match action {
            AuthorAction::Create { username, password } => {
                create_author_account(&config, username, password);
            }
            AuthorAction::List => {
                list_author_accounts(&config);
            }
            AuthorAction::ChangePassword { username, new_password } => {
                change_author_password(&config, username, new_password);
            }
        },
    }
}

fn setup_blog_database(config: &Config) {
    let db_path = config.blog_db_path();
    if db_path.exists() {
        println!("ℹ️ Blog database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up blog database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create blog database file.");
    match db_setup::setup_blog_db(&mut conn) {
        Ok(_) => println!("✅ Blog database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up blog database: {}", e),
    }
}

fn create_author_account(config: &Config, username: &str, password: &str) {
    let db_path = config.blog_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Blog database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return;
    }
    let conn = Connection::open(&db_path).expect("Could not open blog database.");

    match users_db_operations::create_user(&conn, username, password) {
        Ok(_) => println!("✅ Author account '{}' created successfully.", username),
        Err(e) => eprintln!("❌ Error creating author account: {}. It might be because the username already exists.", e),
    }
}

fn list_author_accounts(config: &Config) {
    let conn = match Connection::open(config.blog_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Blog database not found. Please run `setup_cli db setup` first.");
            return;
        }
    };

    println!("Listing author accounts:");
    match users_db_operations::read_all_users(&conn) {
        Ok(users) => {
            for user in users {
                let status = if user.is_active { "active" } else { "suspended" };
                println!("- {} ({})", user.username, status);
            }
        }
        Err(e) => eprintln!("❌ Error fetching author accounts: {}", e),
    }
}

fn change_author_password(config: &Config, username: &str, new_password: &str) {
    let conn = match Connection::open(config.blog_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Blog database not found.");
            return;
        }
    };
    match users_db_operations::change_password(&conn, username, new_password) {
        Ok(0) => eprintln!("❌ Error: No author account named '{}' found.", username),
        Ok(_) => println!("✅ Password for '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
