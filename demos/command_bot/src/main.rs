//! Command Bot Demo
//!
//! A self-contained demonstration of the Courier pipeline against a
//! scripted in-memory platform:
//!
//! - A session tree loading a user profile and, below it, a locale
//! - A per-chat throttle middleware backed by a shared keyed store
//! - Two listeners (commands, confirmations) with predicate-guarded
//!   handlers and a method-level recovery override
//!
//! # Usage
//!
//! ```bash
//! cargo run --package command-bot
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use courier::prelude::*;
use courier::core::{ApiResult, LoadedContexts};
use courier::runtime::config::{CourierConfig, LogLevel};
use courier::transport::{TransportResult, DecodeError};

// ============================================================================
// Scripted Platform
// ============================================================================

/// Replier that prints outbound messages instead of calling a platform.
struct ConsoleReplier;

#[async_trait]
impl Replier for ConsoleReplier {
    async fn send_text(&self, chat: ChatId, text: &str) -> ApiResult<i64> {
        info!(chat = %chat, "reply: {text}");
        Ok(1)
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()> {
        info!(callback_id, text = text.unwrap_or(""), "callback answered");
        Ok(())
    }
}

fn scripted_message(chat: i64, user: i64, text: &str) -> Event {
    Event::Message(MessageEvent {
        chat: ChatId(chat),
        sender: Sender {
            user_id: UserId(user),
            username: Some(format!("user{user}")),
            display_name: None,
        },
        message_id: 1,
        text: text.to_string(),
        reply: ReplyHandle::new(ChatId(chat), Arc::new(ConsoleReplier)),
    })
}

fn scripted_callback(chat: i64, user: i64, data: &str) -> Event {
    Event::Callback(CallbackEvent {
        chat: ChatId(chat),
        sender: Sender::new(UserId(user)),
        callback_id: format!("cb-{chat}"),
        data: data.to_string(),
        reply: ReplyHandle::new(ChatId(chat), Arc::new(ConsoleReplier)),
    })
}

/// Puller that replays a fixed script, then idles.
struct ScriptedPuller {
    script: VecDeque<(Duration, Event)>,
}

#[async_trait]
impl UpdatePuller for ScriptedPuller {
    async fn pull(&mut self) -> TransportResult<Vec<Event>> {
        match self.script.pop_front() {
            Some((delay, event)) => {
                tokio::time::sleep(delay).await;
                Ok(vec![event])
            }
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct NoDecoder;

impl UpdateDecoder for NoDecoder {
    fn decode(&self, _body: &[u8]) -> std::result::Result<Vec<Event>, DecodeError> {
        Err(DecodeError::new("the demo platform has no webhook mode"))
    }
}

struct DemoPlatform;

impl PlatformAdapter for DemoPlatform {
    type Puller = ScriptedPuller;
    type Decoder = NoDecoder;

    fn puller(&self, _config: &PollingConfig) -> TransportResult<Self::Puller> {
        let step = Duration::from_millis(100);
        Ok(ScriptedPuller {
            script: VecDeque::from([
                (step, scripted_message(10, 1, "/start")),
                (step, scripted_message(10, 1, "/help")),
                // Fired instantly after the previous one: the throttle
                // middleware drops it.
                (Duration::ZERO, scripted_message(10, 1, "/help again")),
                (step, scripted_callback(20, 2, "confirm")),
                (step, scripted_message(30, 3, "/crash")),
            ]),
        })
    }

    fn decoder(&self, _config: &WebhookConfig) -> TransportResult<Self::Decoder> {
        Ok(NoDecoder)
    }
}

// ============================================================================
// Session Contexts
// ============================================================================

/// Resolves the sender into a display name.
#[derive(Default)]
struct UserProfile {
    display_name: String,
}

#[async_trait]
impl SessionContext for UserProfile {
    fn name(&self) -> &'static str {
        "user-profile"
    }

    async fn load(&mut self, event: &Event, _loaded: &LoadedContexts) -> Result<()> {
        let sender = event.sender();
        self.display_name = sender
            .username
            .clone()
            .unwrap_or_else(|| format!("user-{}", sender.user_id));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Picks a locale for the profile loaded above it.
#[derive(Default)]
struct Locale {
    greeting: &'static str,
}

#[async_trait]
impl SessionContext for Locale {
    fn name(&self) -> &'static str {
        "locale"
    }

    async fn load(&mut self, _event: &Event, loaded: &LoadedContexts) -> Result<()> {
        let profile = loaded
            .get::<UserProfile>()
            .ok_or_else(|| anyhow::anyhow!("user profile not loaded"))?;
        self.greeting = if profile.display_name.ends_with('2') {
            "moin"
        } else {
            "hello"
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Drops events arriving too quickly from the same chat.
///
/// Instances are per-event; the keyed store is the deliberately shared
/// backing state, serialized per chat through the mutex.
struct ChatThrottle {
    last_seen: Arc<Mutex<HashMap<ChatId, Instant>>>,
    min_gap: Duration,
}

#[async_trait]
impl Middleware for ChatThrottle {
    fn name(&self) -> &'static str {
        "chat-throttle"
    }

    async fn reject(&self, event: &Event) -> bool {
        let mut last_seen = self.last_seen.lock();
        match last_seen.insert(event.chat(), Instant::now()) {
            Some(previous) => previous.elapsed() < self.min_gap,
            None => false,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn on_start(ctx: Arc<EventContext>) -> Result<()> {
    let profile = ctx
        .context::<UserProfile>()
        .ok_or_else(|| anyhow::anyhow!("profile missing"))?;
    let locale = ctx
        .context::<Locale>()
        .ok_or_else(|| anyhow::anyhow!("locale missing"))?;

    ctx.reply()
        .reply(&format!("{}, {}!", locale.greeting, profile.display_name))
        .await?;
    Ok(())
}

async fn on_help(ctx: Arc<EventContext>) -> Result<()> {
    ctx.reply()
        .reply("commands: /start, /help, /crash")
        .await?;
    Ok(())
}

async fn on_confirm(ctx: Arc<EventContext>) -> Result<()> {
    let callback = ctx
        .event()
        .as_callback()
        .ok_or_else(|| anyhow::anyhow!("not a callback"))?;

    ctx.reply()
        .answer_callback(&callback.callback_id, Some("confirmed"))
        .await?;
    ctx.reply().reply("your order is confirmed").await?;
    Ok(())
}

async fn on_crash(_ctx: Arc<EventContext>) -> Result<()> {
    anyhow::bail!("this handler always fails")
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let mut builder = SessionTree::builder();
    let profile = builder.root(context_factory(UserProfile::default));
    builder.child(profile, context_factory(Locale::default));
    let sessions = builder.build();

    let throttle_store = Arc::new(Mutex::new(HashMap::new()));

    let dispatcher = Dispatcher::builder()
        .session_tree(sessions)
        .middleware(middleware_factory(move || ChatThrottle {
            last_seen: Arc::clone(&throttle_store),
            min_gap: Duration::from_millis(50),
        }))
        .message_listener(
            Listener::new("commands")
                .handler(HandlerDef::new("start", on_start).predicate(is_command("start")))
                .handler(HandlerDef::new("help", on_help).predicate(is_command("help")))
                .handler(
                    HandlerDef::new("crash", on_crash)
                        .predicate(is_command("crash"))
                        .on_error(recovery_fn(|ctx, error| async move {
                            ctx.reply().reply("that one is broken, sorry").await?;
                            info!(error = %error, "crash command recovered");
                            Ok(())
                        })),
                ),
        )
        .callback_listener(
            Listener::new("confirmations").handler(
                HandlerDef::new("confirm", on_confirm).predicate(callback_data("confirm")),
            ),
        )
        .on_error(recovery_fn(|_ctx, error| async move {
            info!(error = %error, "globally recovered");
            Ok(())
        }))
        .build();

    let mut config = CourierConfig::default();
    config.logging.level = LogLevel::Debug;
    if let FetchStrategy::Polling(polling) = &mut config.fetch {
        polling.token = "demo-token".to_string();
    }

    let runtime = CourierRuntime::builder()
        .without_env()
        .merge(config)
        .dispatcher(dispatcher)
        .build()?;

    // The script is exhausted well within the window.
    runtime
        .run_until(DemoPlatform, tokio::time::sleep(Duration::from_secs(2)))
        .await?;

    Ok(())
}
