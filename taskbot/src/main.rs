use log::{LevelFilter, error, info};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Logger, Root};
use poise::serenity_prelude as serenity;
use taskbot::commands::admin::AdminCommands;
use taskbot::commands::task::TaskCommands;
use taskbot::config::Config;
use taskbot::connectors::discord::serenity::{Context, Data, SerenityDiscordConnector};
use taskbot::guild_config::ConfigRepository;
use taskbot::liveness;
use taskbot::tasks::{TaskEdit, TaskRepository};
use tokio::sync::Mutex;

/// Check that the bot is responsive
#[poise::command(slash_command)]
async fn ping(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    AdminCommands::new(&ctx.data().guild_configs, &connector)
        .ping()
        .await?;
    Ok(())
}

/// Configure the bot for this server (administrators only)
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands(
        "config_show",
        "config_set_welcome_channel",
        "config_set_logging_channel"
    ),
    subcommand_required
)]
async fn config(_ctx: Context<'_>) -> anyhow::Result<()> {
    Ok(())
}

/// Show the current server settings
#[poise::command(
    slash_command,
    rename = "show",
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
async fn config_show(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    AdminCommands::new(&ctx.data().guild_configs, &connector)
        .show_config()
        .await?;
    Ok(())
}

/// Set the channel that receives welcome messages
#[poise::command(
    slash_command,
    rename = "set_welcome_channel",
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
async fn config_set_welcome_channel(
    ctx: Context<'_>,
    #[description = "Text channel to use as the welcome channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    AdminCommands::new(&ctx.data().guild_configs, &connector)
        .set_welcome_channel(channel.id.get())
        .await?;
    Ok(())
}

/// Set the channel that receives the bot's logs
#[poise::command(
    slash_command,
    rename = "set_logging_channel",
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
async fn config_set_logging_channel(
    ctx: Context<'_>,
    #[description = "Text channel to use as the logging channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    AdminCommands::new(&ctx.data().guild_configs, &connector)
        .set_logging_channel(channel.id.get())
        .await?;
    Ok(())
}

/// Create a new task
#[poise::command(slash_command)]
async fn task_add(
    ctx: Context<'_>,
    #[description = "Title of the task"] title: String,
    #[description = "Details of the task"] description: Option<String>,
    #[description = "Due date in YYYY-MM-DD format (e.g. 2023-12-31)"] due_date: Option<String>,
    #[description = "Member responsible for the task"] assignee: Option<serenity::User>,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    TaskCommands::new(&ctx.data().tasks, &connector)
        .add(title, description, due_date, assignee.map(|user| user.id.get()))
        .await?;
    Ok(())
}

/// List the active tasks
#[poise::command(slash_command)]
async fn task_list(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    TaskCommands::new(&ctx.data().tasks, &connector)
        .list()
        .await?;
    Ok(())
}

/// Mark a task as done
#[poise::command(slash_command)]
async fn task_done(
    ctx: Context<'_>,
    #[description = "ID of the task to complete"] task_id: String,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    TaskCommands::new(&ctx.data().tasks, &connector)
        .done(&task_id)
        .await?;
    Ok(())
}

/// Delete a task (it is kept in the history)
#[poise::command(slash_command)]
async fn task_delete(
    ctx: Context<'_>,
    #[description = "ID of the task to delete"] task_id: String,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    TaskCommands::new(&ctx.data().tasks, &connector)
        .delete(&task_id)
        .await?;
    Ok(())
}

/// Edit a task
#[poise::command(slash_command)]
async fn task_edit(
    ctx: Context<'_>,
    #[description = "ID of the task to edit"] task_id: String,
    #[description = "New title (omit to keep)"] title: Option<String>,
    #[description = "New details (omit to keep)"] description: Option<String>,
    #[description = "New due date in YYYY-MM-DD format, or 'none' to clear (omit to keep)"]
    due_date: Option<String>,
    #[description = "New member responsible (omit to keep)"] assignee: Option<serenity::User>,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let edit = TaskEdit {
        title,
        description,
        due_date,
        assignee_id: assignee.map(|user| user.id.get()),
    };
    TaskCommands::new(&ctx.data().tasks, &connector)
        .edit(&task_id, edit)
        .await?;
    Ok(())
}

/// Show every detail of a task
#[poise::command(slash_command)]
async fn task_detail(
    ctx: Context<'_>,
    #[description = "ID of the task to show"] task_id: String,
) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    TaskCommands::new(&ctx.data().tasks, &connector)
        .detail(&task_id)
        .await?;
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, anyhow::Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Command '{}' failed: {:#}", ctx.command().name, error);
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Every slash command the bot registers.
fn commands() -> Vec<poise::Command<Data, anyhow::Error>> {
    vec![
        ping(),
        config(),
        task_add(),
        task_list(),
        task_done(),
        task_delete(),
        task_edit(),
        task_detail(),
    ]
}

fn init_logging(level: LevelFilter) -> anyhow::Result<()> {
    let stdout = ConsoleAppender::builder().build();
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("taskbot", level))
        .build(Root::builder().appender("stdout").build(LevelFilter::Warn))?;
    log4rs::init_config(log_config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?;
    init_logging(settings.log_level_filter())?;

    let data = Data {
        tasks: Mutex::new(TaskRepository::load(settings.tasks_path())),
        guild_configs: Mutex::new(ConfigRepository::load(settings.guild_configs_path())),
    };

    liveness::spawn(settings.port);

    let framework = poise::Framework::<Data, anyhow::Error>::builder()
        .options(poise::FrameworkOptions {
            commands: commands(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Logged in as {}", ready.user.name);
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}
