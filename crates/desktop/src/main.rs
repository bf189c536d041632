//! `erpdesk` command-line front end.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use erpdesk_auth::{Role, User};
use erpdesk_core::UserId;
use erpdesk_desktop::views::{DashboardView, Notice};
use erpdesk_desktop::{AppState, ClientConfig, Resolution, Route};

#[derive(Parser)]
#[command(name = "erpdesk", version, about = "Role-based admin client for the ERP user service")]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "ERPDESK_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        username: String,
        #[arg(long, env = "ERPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Open a client route (/, /dashboard, /profile)
    Open { path: String },
    /// Manage users (staff only)
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List the users visible to you
    List,
    /// Create a user
    Add(NewUserArgs),
    /// Edit a user; omitted fields keep their value
    Edit {
        id: UserId,
        #[command(flatten)]
        changes: UserChanges,
    },
    /// Delete a user
    Delete { id: UserId },
}

#[derive(Args)]
struct NewUserArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "ERPDESK_NEW_USER_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "employee")]
    role: Role,
}

#[derive(Args)]
struct UserChanges {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    role: Option<Role>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    erpdesk_observability::init(config.log_format);

    let app = AppState::new(config).context("Failed to set up client")?;
    app.start().await;

    match cli.command {
        Commands::Login { username, password } => cmd_login(&app, username, password).await,
        Commands::Logout => cmd_logout(&app).await,
        Commands::Whoami => cmd_whoami(&app),
        Commands::Open { path } => cmd_open(&app, &path).await,
        Commands::Users(command) => cmd_users(&app, command).await,
    }
}

async fn cmd_login(app: &AppState, username: String, password: String) -> Result<()> {
    let mut view = app.login_view();
    view.set_username(username);
    view.set_password(password);

    let outcome = view.submit().await;
    if let Some(notice) = view.notice() {
        print_notice(notice);
    }
    let home = outcome.context("Login failed")?;
    println!("Continue at {home}");
    Ok(())
}

async fn cmd_logout(app: &AppState) -> Result<()> {
    if app.session().session().user().is_none() {
        println!("Not signed in.");
        return Ok(());
    }
    let mut view = app.profile_view();
    view.logout().await;
    if let Some(notice) = view.notice() {
        print_notice(notice);
    }
    Ok(())
}

fn cmd_whoami(app: &AppState) -> Result<()> {
    match app.session().session().user() {
        Some(user) => println!("{} ({}) <{}>", user.username, user.role, user.email),
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn cmd_open(app: &AppState, path: &str) -> Result<()> {
    match app.navigate(path) {
        Resolution::NotFound => bail!("No route for '{path}'"),
        Resolution::Pending => println!("Loading..."),
        Resolution::Render(Route::Login) => {
            println!("[{}] Sign in with `erpdesk login <username>`.", Route::Login);
        }
        Resolution::Render(Route::Profile) => {
            let card = app
                .profile_view()
                .render()
                .context("Session ended while rendering profile")?;
            println!("[{}]", Route::Profile);
            println!("{}", card.greeting);
            println!("Role:  {}", card.role);
            println!("Name:  {}", card.name);
            println!("Email: {}", card.email);
        }
        Resolution::Render(Route::Dashboard) => {
            let mut view = app.dashboard_view().await?;
            if let Err(err) = view.load().await {
                eprintln!("Showing cached users: {err}");
            }
            println!("[{}] Signed in as {}", Route::Dashboard, view.viewer().username);
            let stats = view.stats();
            println!(
                "Total: {}  Admins: {}  Managers: {}  Employees: {}",
                stats.total, stats.admins, stats.managers, stats.employees
            );
            print_users(&view.visible_users());
        }
    }
    Ok(())
}

async fn cmd_users(app: &AppState, command: UsersCommand) -> Result<()> {
    let mut view = app.dashboard_view().await?;

    match command {
        UsersCommand::List => {
            view.load().await.context("Failed to fetch users")?;
            print_users(&view.visible_users());
            return Ok(());
        }
        UsersCommand::Add(args) => {
            view.open_add()?;
            let form = view.form_mut();
            form.username = args.username;
            form.first_name = args.first_name;
            form.last_name = args.last_name;
            form.email = args.email;
            form.password = args.password;
            form.role = args.role;
            let outcome = view.save().await;
            report(&view, outcome.map(|user| println!("Created user #{}", user.id)))?;
        }
        UsersCommand::Edit { id, changes } => {
            view.load().await.context("Failed to fetch users")?;
            view.open_edit(id)?;
            let form = view.form_mut();
            if let Some(username) = changes.username {
                form.username = username;
            }
            if let Some(first_name) = changes.first_name {
                form.first_name = first_name;
            }
            if let Some(last_name) = changes.last_name {
                form.last_name = last_name;
            }
            if let Some(email) = changes.email {
                form.email = email;
            }
            if let Some(role) = changes.role {
                form.role = role;
            }
            let outcome = view.save().await;
            report(&view, outcome.map(|_| ()))?;
        }
        UsersCommand::Delete { id } => {
            view.load().await.context("Failed to fetch users")?;
            view.open_delete(id)?;
            let outcome = view.confirm_delete().await;
            report(&view, outcome)?;
        }
    }
    Ok(())
}

fn report(view: &DashboardView, outcome: Result<(), erpdesk_desktop::ClientError>) -> Result<()> {
    if let Some(notice) = view.notice() {
        print_notice(notice);
    }
    if let Err(err) = outcome {
        if let Some(errors) = err.field_errors() {
            for (field, message) in errors.iter() {
                eprintln!("  {field}: {message}");
            }
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{notice}");
    } else {
        println!("{notice}");
    }
}

fn print_users(users: &[&User]) {
    println!("{:<6} {:<16} {:<24} {:<28} {}", "ID", "USERNAME", "NAME", "EMAIL", "ROLE");
    for user in users {
        println!(
            "{:<6} {:<16} {:<24} {:<28} {}",
            user.id,
            user.username,
            user.display_name(),
            user.email,
            user.role
        );
    }
}
