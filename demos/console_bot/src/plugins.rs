//! Plugins and middleware for the console demo.
//!
//! ```text
//! admin (adm)          moderation group, admins only
//! ├── ban (b) <user>   ban a user
//! ├── unban (u) <user> lift a ban
//! └── list (ls)        show banned users
//! ping                 pong
//! echo (say) <text>    repeat text
//! count                per-session counter
//! whoami               show the current session
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use switchboard::framework::CommandRequest;
use switchboard::prelude::*;
use tracing::info;

use crate::adapters::USER_KEY;

type BanList = Arc<Mutex<BTreeSet<String>>>;

/// Logs every command invocation with its duration.
pub fn audit() -> Middleware {
    middleware_fn(|req: CommandRequest, next: Next| async move {
        let command = req.ctx.command().full_path().to_string();
        let args = req.args.len();
        let started = Instant::now();
        let result = next.run(req).await;
        info!(
            command = %command,
            args,
            ok = result.is_ok(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Command finished"
        );
        result
    })
}

/// Rejects callers whose `user` is not in `admins`.
pub fn admin_only(admins: Vec<String>) -> Middleware {
    let admins = Arc::new(admins);
    middleware_fn(move |req: CommandRequest, next: Next| {
        let admins = Arc::clone(&admins);
        async move {
            let user = req
                .ctx
                .event()
                .data
                .get(USER_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !admins.iter().any(|admin| admin == user) {
                req.ctx.reply_error(format!("{user} is not allowed to do that"));
                return Ok(());
            }
            next.run(req).await
        }
    })
}

// =============================================================================
// Admin plugin
// =============================================================================

pub struct AdminPlugin {
    admins: Vec<String>,
    banned: BanList,
}

impl AdminPlugin {
    pub fn new(admins: Vec<String>) -> Self {
        Self {
            admins,
            banned: BanList::default(),
        }
    }
}

async fn ban(banned: BanList, ctx: Arc<CommandContext>, args: Vec<String>) -> Result<(), BoxError> {
    let Some((user, reason)) = args.split_first() else {
        return Err("usage: admin ban <user> [reason...]".into());
    };
    if !banned.lock().insert(user.clone()) {
        ctx.reply_text(format!("{user} is already banned"));
        return Ok(());
    }
    if reason.is_empty() {
        ctx.reply_text(format!("banned {user}"));
    } else {
        ctx.reply_text(format!("banned {user}: {}", reason.join(" ")));
    }
    Ok(())
}

async fn unban(banned: BanList, ctx: Arc<CommandContext>, args: Vec<String>) -> Result<(), BoxError> {
    let [user] = args.as_slice() else {
        return Err("usage: admin unban <user>".into());
    };
    if banned.lock().remove(user) {
        ctx.reply_text(format!("unbanned {user}"));
    } else {
        ctx.reply_text(format!("{user} was not banned"));
    }
    Ok(())
}

async fn list(banned: BanList, ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
    let banned = banned.lock().iter().cloned().collect::<Vec<_>>();
    if banned.is_empty() {
        ctx.reply_text("nobody is banned");
    } else {
        ctx.reply_text(banned.join(", "));
    }
    Ok(())
}

impl Plugin for AdminPlugin {
    fn name(&self) -> &str {
        "admin"
    }

    fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]) {
        let banned = &self.banned;
        let admin = Command::builder("admin")
            .alias("adm")
            .description("Moderation commands")
            .subcommand(
                Command::builder("ban")
                    .alias("b")
                    .description("Ban a user")
                    .usage("admin ban <user> [reason...]")
                    .handler_fn({
                        let banned = Arc::clone(banned);
                        move |ctx, args| ban(Arc::clone(&banned), ctx, args)
                    }),
            )
            .subcommand(
                Command::builder("unban")
                    .alias("u")
                    .description("Lift a ban")
                    .usage("admin unban <user>")
                    .handler_fn({
                        let banned = Arc::clone(banned);
                        move |ctx, args| unban(Arc::clone(&banned), ctx, args)
                    }),
            )
            .subcommand(
                Command::builder("list")
                    .alias("ls")
                    .description("Show banned users")
                    .handler_fn({
                        let banned = Arc::clone(banned);
                        move |ctx, args| list(Arc::clone(&banned), ctx, args)
                    }),
            );

        let mut stack = middlewares.to_vec();
        stack.push(admin_only(self.admins.clone()));
        registry.register(admin, &stack);
    }
}

// =============================================================================
// Utility plugin
// =============================================================================

pub struct UtilPlugin;

async fn ping(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
    ctx.reply_text("pong");
    Ok(())
}

async fn echo(ctx: Arc<CommandContext>, args: Vec<String>) -> Result<(), BoxError> {
    if args.is_empty() {
        return Err("nothing to echo".into());
    }
    ctx.reply_text(args.join(" "));
    Ok(())
}

async fn count(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
    let session = ctx.session().ok_or("no session")?;
    let next = session.get::<u64>("count").map_or(1, |n| *n + 1);
    session.insert("count", next);
    ctx.reply_text(next.to_string());
    Ok(())
}

async fn whoami(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
    match ctx.session() {
        Some(session) if !session.is_anonymous() => ctx.reply_text(session.id.clone()),
        _ => ctx.reply_text("anonymous"),
    }
    Ok(())
}

impl Plugin for UtilPlugin {
    fn name(&self) -> &str {
        "util"
    }

    fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]) {
        registry.register(
            Command::builder("ping")
                .description("Check that the bot is alive")
                .handler_fn(ping),
            middlewares,
        );
        registry.register(
            Command::builder("echo")
                .alias("say")
                .description("Repeat the given text")
                .usage("echo <text...>")
                .handler_fn(echo),
            middlewares,
        );
        registry.register(
            Command::builder("count")
                .description("Count invocations in this session")
                .handler_fn(count),
            middlewares,
        );
        registry.register(
            Command::builder("whoami")
                .description("Show the current session")
                .handler_fn(whoami),
            middlewares,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard::framework::EventProcessor;

    fn processor() -> EventProcessor {
        let registry = Arc::new(CommandRegistry::new());
        AdminPlugin::new(vec!["root".into()]).register_commands(&registry, &[audit()]);
        UtilPlugin.register_commands(&registry, &[audit()]);
        EventProcessor::new(registry, "/")
    }

    async fn send(processor: &EventProcessor, user: &str, text: &str) -> Response {
        let event = Event::message("console")
            .with_text(text)
            .with_data(USER_KEY, user)
            .with_session(Arc::new(Session::new(format!("console:{user}"))));
        processor
            .process(&CancellationToken::new(), Arc::new(event))
            .await
    }

    #[tokio::test]
    async fn test_admin_alias_path() {
        let processor = processor();

        let response = send(&processor, "root", "/adm b mallory spamming").await;
        assert_eq!(response, Response::text("banned mallory: spamming"));

        let response = send(&processor, "root", "/admin ls").await;
        assert_eq!(response, Response::text("mallory"));
    }

    #[tokio::test]
    async fn test_admin_requires_permission() {
        let processor = processor();
        let response = send(&processor, "guest", "/admin ban mallory").await;
        assert_eq!(response.response_type, ResponseType::Error);

        let response = send(&processor, "guest", "/adm").await;
        assert_eq!(response, Response::error("guest is not allowed to do that"));
    }

    #[tokio::test]
    async fn test_group_shows_help() {
        let processor = processor();
        let response = send(&processor, "root", "/admin").await;
        let help = response.as_text().unwrap();
        assert!(help.contains("Command: admin"));
        assert!(help.contains("ban - Ban a user"));
    }

    #[tokio::test]
    async fn test_echo_and_usage_errors() {
        let processor = processor();
        assert_eq!(
            send(&processor, "guest", "/say hello world").await,
            Response::text("hello world")
        );
        assert_eq!(
            send(&processor, "guest", "/echo").await,
            Response::error("nothing to echo")
        );
    }
}
