/// WebSocket session running one tutorial.
///
/// The actor owns the engine outright. Client pointer events are forwarded as
/// they arrive and client tilt is handed over through a [`MotionFeed`]. The
/// engine clock is ticked on a fixed interval, and whatever the engine queued
/// in its [`Outbox`] is flushed to the client after each.
use std::time::Duration;

use actix::prelude::*;
use actix_web::error::ErrorInternalServerError;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{error, info, warn};
use uuid::Uuid;

use crate::config::server::TICK_INTERVAL_MS;
use crate::config::tutorial::TutorialConfig;
use crate::server::anti_spam::AntiSpamState;
use crate::server::messages::{ClientWsMessage, ServerWsMessage};
use crate::server::outbox::Outbox;
use crate::server::ws_error::{ws_banned_message, ws_error_message};
use crate::tutorial::engine::Tutorial;
use crate::tutorial::error::TutorialError;
use crate::tutorial::motion::{Accelerometer, MotionFeed, RemoteMotion};
use crate::tutorial::scheduler::{TimerQueue, WallClock};
use crate::tutorial::types::{Point, Sample};

type LiveTutorial = Tutorial<TimerQueue<WallClock>, Outbox>;

pub struct TutorialSession {
    pub session_id: Uuid,
    tutorial: LiveTutorial,
    motion: MotionFeed,
    anti_spam: AntiSpamState,
}

impl TutorialSession {
    pub fn new(config: &TutorialConfig) -> Result<Self, TutorialError> {
        let motion = MotionFeed::new();
        // Client tilt first, then the local device, then synthetic samples.
        let source = RemoteMotion::new(
            motion.clone(),
            Box::new(Accelerometer::new(&config.accelerometer_path)),
        );
        let tutorial = Tutorial::new(
            config,
            TimerQueue::new(WallClock::new()),
            Outbox::new(),
            Box::new(source),
        )?;
        Ok(Self {
            session_id: Uuid::new_v4(),
            tutorial,
            motion,
            anti_spam: AntiSpamState::new(),
        })
    }

    fn send(&self, msg: &ServerWsMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                error!("[TutorialSession] Failed to serialize {:?}: {}", msg, e);
                ctx.text(ws_error_message(
                    "INTERNAL_ERROR",
                    "Internal server error",
                    Some(&self.session_id.to_string()),
                ));
            }
        }
    }

    /// Send everything the engine queued, then close if it asked to quit.
    fn flush(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        for msg in self.tutorial.host_mut().drain() {
            self.send(&msg, ctx);
        }
        if self.tutorial.host().quit_requested() {
            ctx.close(Some(ws::CloseReason {
                code: ws::CloseCode::Normal,
                description: Some("Tutorial closed".into()),
            }));
            ctx.stop();
        }
    }

    fn send_error(&mut self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        let session = self.session_id.to_string();
        if self.anti_spam.should_send_error(code, &session) {
            ctx.text(ws_error_message(code, message, Some(&session)));
        }
    }

    fn send_ban_and_close(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let context = format!(
            "session={} ban_remaining_secs={}",
            self.session_id,
            self.anti_spam.ban_remaining_secs()
        );
        ctx.text(ws_banned_message(Some(&context)));
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some("Banned for spam".into()),
        }));
        ctx.stop();
    }

    fn handle_client_message(
        &mut self,
        msg: ClientWsMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match msg {
            ClientWsMessage::PointerDown { x, y } => {
                self.tutorial.on_pointer_down(Point::new(x, y))
            }
            ClientWsMessage::PointerUp { x, y } => self.tutorial.on_pointer_up(Point::new(x, y)),
            ClientWsMessage::Motion { x, y, z } => self.motion.push(Sample { x, y, z }),
            ClientWsMessage::Quit => self.tutorial.quit(),
            ClientWsMessage::Ping => {
                // Keep-alive only.
            }
        }
        self.anti_spam.reset_on_valid_action();
        self.flush(ctx);
    }
}

impl Actor for TutorialSession {
    type Context = ws::WebsocketContext<Self>;

    /// Greets the client with the grid layout and the first scene, then
    /// starts the engine clock.
    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[TutorialSession] Session {} started", self.session_id);
        let geometry = *self.tutorial.tokens().geometry();
        self.send(
            &ServerWsMessage::Welcome {
                session_id: self.session_id,
                width: geometry.width,
                height: geometry.height,
                dot_size: geometry.dot_size,
            },
            ctx,
        );
        self.flush(ctx);

        ctx.run_interval(Duration::from_millis(TICK_INTERVAL_MS), |act, ctx| {
            act.tutorial.tick();
            act.flush(ctx);
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            "[TutorialSession] Session {} stopped in {:?}",
            self.session_id,
            self.tutorial.stage()
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TutorialSession {
    /// Handles incoming WebSocket messages from the client.
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                if self.anti_spam.record_request(&self.session_id.to_string()) {
                    self.send_ban_and_close(ctx);
                    return;
                }
                match serde_json::from_str::<ClientWsMessage>(&text) {
                    Ok(msg) => self.handle_client_message(msg, ctx),
                    Err(e) => {
                        warn!(
                            "[TutorialSession] Invalid client message from {}: {}",
                            self.session_id, e
                        );
                        self.send_error(ctx, "INVALID_MESSAGE", "Invalid client message");
                    }
                }
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("[TutorialSession] Protocol error on {}: {}", self.session_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// WebSocket endpoint for the tutorial. Every connection starts a fresh round.
pub async fn ws_tutorial(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    let session = TutorialSession::new(&data.config).map_err(ErrorInternalServerError)?;
    ws::start(session, &req, stream)
}
