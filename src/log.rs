//! Logging functionality and error reporting.
//! The logging library of choice is [tracing].

use itertools::Itertools;
use poise::BoxFuture;
use poise::CreateReply;
use poise::FrameworkError;
use serenity::CreateMessage;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::serenity;
use crate::Config;
use crate::Context;
use crate::Data;
use crate::LarkError;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Setup format layers, tracing subscribers, and installs tracing.
pub(super) fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    // Uses local time.
    let timer = fmt::time::ChronoLocal::rfc_3339();
    let debug = config.console_debug();

    // Set which traces are tracked.
    // By default, all INFO traces and above are shown.
    let target = if debug {
        Targets::new()
            .with_default(LevelFilter::INFO)
            .with_target(THIS_CRATE, LevelFilter::DEBUG)
    } else {
        Targets::new().with_default(LevelFilter::INFO)
    };

    // Compose the layer that prints traces to stdout.
    // Debug mode adds source locations.
    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_file(debug)
        .with_level(true)
        .with_line_number(debug)
        .with_target(true)
        .with_timer(timer.clone())
        .pretty()
        .with_filter(target.clone());

    // Compose the layer that writes logs and get a guard for the writer.
    let (log_layer, guard) = if config.logs_enabled() {
        // Put file logs in `log_dir` directory as "{THIS_CRATE}.log.{TIMESTAMP}" on an hourly basis.
        let prefix_format = format!("{THIS_CRATE}.log");
        let appender = tracing_appender::rolling::hourly(config.log_dir(), prefix_format);

        // Create the writer and writer guard.
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(debug)
            .with_level(true)
            .with_line_number(debug)
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .compact()
            .with_filter(target);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // Add all the layers and initialize them.
    tracing_subscriber::registry()
        .with(console_layer)
        .with(log_layer)
        .init();

    guard
}

/// Defines various behaviors for how to handle errors.
/// [UserError]s are replied to the author and only logged as debug.
/// Triggers a [notify_bug] on unexpected errors.
pub fn handle_framework_error(err: FrameworkError<Data, LarkError>) -> BoxFuture<()> {
    Box::pin(async move {
        let err = match as_user_error(err) {
            Ok((ctx, user_error)) => return reply_user_error(&ctx, user_error).await,
            Err(err) => err,
        };

        match err {
            // Silent, the user never sees these.
            FrameworkError::Setup { error, .. } => error!("Error during startup: {error}"),
            FrameworkError::EventHandler { error, event, .. } => {
                error!("Event {name} failed: {error}", name = event.snake_case_name())
            }
            // Any message starting with the prefix ends up here, that's not a bug.
            FrameworkError::UnknownCommand {
                msg_content,
                prefix,
                ..
            } => debug!("Ignoring unknown command '{msg_content}' (prefix '{prefix}')."),

            // Bad input is explained along with what poise could not parse.
            FrameworkError::ArgumentParse {
                error, input, ctx, ..
            } => {
                let user_error = UserError::BadArgs { input };
                Response::builder()
                    .ctx(&ctx)
                    .reply(user_error.to_string())
                    .source(user_error)
                    .add_info(error.to_string())
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::CommandCheckFailed { error, ctx, .. } => {
                let error = LarkError::CheckFailed {
                    reason: error.map(|e| e.to_string()),
                };
                Response::builder()
                    .ctx(&ctx)
                    .reply(error.to_string())
                    .source(error)
                    .build()
                    .send()
                    .await;
            }

            // Bugs. The user hears that something broke and the notify list gets a DM.
            FrameworkError::Command { error, ctx, .. } => {
                Response::builder()
                    .ctx(&ctx)
                    .reply("Something went wrong... A bug report has been sent.")
                    .source(error)
                    .notify(true)
                    .is_error(true)
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::CommandPanic { payload, ctx, .. } => {
                Response::builder()
                    .ctx(&ctx)
                    .reply("Something went horribly wrong... A bug report has been sent.")
                    .source(LarkError::Panic { payload })
                    .notify(true)
                    .is_error(true)
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::CommandStructureMismatch {
                description, ctx, ..
            } => {
                let error = LarkError::CommandStructureMismatch {
                    description: description.to_string(),
                };
                Response::builder()
                    .ctx(&ctx.into())
                    .reply("Discord still has an old version of this command, try again later.")
                    .source(error)
                    .notify(true)
                    .is_error(true)
                    .build()
                    .send()
                    .await;
            }

            // Unreachable with this framework setup.
            FrameworkError::UnknownInteraction { interaction, .. } => {
                error!("Received unknown interaction: {}", interaction.data.name)
            }
            other => error!("Unhandled framework error: {other}"),
        }
    })
}

/// Framework errors that only mean the user has to do something differently.
/// Anything else is handed back.
fn as_user_error(
    err: FrameworkError<'_, Data, LarkError>,
) -> Result<(Context<'_>, UserError), FrameworkError<'_, Data, LarkError>> {
    let pair = match err {
        FrameworkError::Command {
            error: LarkError::UserError(user_error),
            ctx,
            ..
        } => {
            if let UserError::Resolve(resolve) = &user_error {
                // Extraction failures are worth seeing without debug logs.
                info!("'{}' could not be resolved: {resolve}", ctx.invocation_string());
            }
            (ctx, user_error)
        }
        FrameworkError::SubcommandRequired { ctx } => {
            let subcmds = ctx
                .command()
                .subcommands
                .iter()
                .map(|s| s.name.as_str())
                .join(", ");
            (ctx, UserError::MissingSubcommand { subcmds })
        }
        FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => (ctx, UserError::OnCooldown { remaining_cooldown }),
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => (
            ctx,
            UserError::MissingBotPermissions {
                missing_permissions,
            },
        ),
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => (
            ctx,
            UserError::MissingUserPermissions {
                missing_permissions,
            },
        ),
        FrameworkError::NotAnOwner { ctx, .. } => (ctx, UserError::NotOwner),
        FrameworkError::GuildOnly { ctx, .. } => (ctx, UserError::GuildOnly),
        FrameworkError::DmOnly { ctx, .. } => (ctx, UserError::DmOnly),
        FrameworkError::NsfwOnly { ctx, .. } => (ctx, UserError::NsfwOnly),
        other => return Err(other),
    };
    Ok(pair)
}

/// Tell the author what they did wrong, logging it as debug.
async fn reply_user_error(ctx: &Context<'_>, user_error: UserError) {
    Response::builder()
        .ctx(ctx)
        .reply(user_error.to_string())
        .source(user_error)
        .build()
        .send()
        .await;
}

/// Sends an ephemeral reply to the [Context] author.
/// Prefix commands can't be ephemeral, so those get a normal reply.
async fn ephemeral_reply(ctx: &Context<'_>, content: impl Into<String>) {
    let reply = CreateReply::default()
        .ephemeral(true)
        .reply(true)
        .content(content);
    if let Err(e) = ctx.send(reply).await {
        error!("Failed to send ephemeral reply. {e}")
    };
}

/// Sends a notification (via private message) to users in the configured notify list.
/// If message fails, only log and don't retry.
async fn notify_bug(ctx: &Context<'_>, content: impl Into<String>) {
    let message = CreateMessage::new().content(content);

    let notify_list = &ctx.data().notify_list;
    for user in notify_list {
        if let Err(e) = user.direct_message(ctx, message.clone()).await {
            error!("Failed to send bug notification. {e}");
        }
    }
}

/// Helper function to create debug information from [Context]
fn debug_info(ctx: &Context) -> String {
    let user = &ctx.author().name;
    let cmd = &ctx.command().name;
    let user_input = ctx.invocation_string();
    let guild = ctx
        .guild_id()
        .map_or("<DM>".to_string(), |id| id.to_string());
    format!("{user} tried to use {cmd} with {user_input} in guild {guild}.")
}

/// Structured response to errors.
/// Always logs as at least [debug level](tracing::debug), but is upgraded to
/// [error level](tracing::error) if `is_error` is set.
/// Additionally, notify messages are accompanied by [debug info](debug_info).
#[derive(bon::Builder)]
#[builder(on(String, into))]
struct Response<'a> {
    /// The context of the response
    ctx: &'a Context<'a>,
    /// The reason for this reply, usually the error causing the response.
    #[builder(into)]
    source: LarkError,
    /// Optional ephemeral reply to user.
    reply: Option<String>,
    /// Additional information to log
    add_info: Option<String>,
    /// Set to `true` to log as error.
    #[builder(default = false)]
    is_error: bool,
    /// Set to `true` to send notifications of the error.
    /// Does nothing if `is_error` is false.
    #[builder(default = false)]
    notify: bool,
}

impl Response<'_> {
    /// Execute the response
    async fn send(&self) {
        let ctx = self.ctx;

        let log_message = {
            let source = &self.source;
            let add_info = self
                .add_info
                .as_ref()
                // Map `None` to "" otherwise format it to be appended to another string.
                .map_or("".to_string(), |s| format!("| {s}"));
            format!("{source} {add_info}")
        };
        if self.is_error {
            error!("{log_message}");
            if self.notify {
                let dbg_info = debug_info(ctx);
                let content = format!("Debug Info: {dbg_info}\n{log_message}");
                notify_bug(ctx, content).await;
            }
        } else {
            debug!("{log_message}");
        }

        // Send ephemeral reply if there is one.
        if let Some(ref reply) = self.reply {
            ephemeral_reply(ctx, reply).await;
        }
    }
}
