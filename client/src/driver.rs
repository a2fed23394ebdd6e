//! Event loop connecting a [RoundSyncClient] to the network.
//!
//! Inbound frames, user commands, HTTP completions, scheduler deadlines, the
//! table poll and reconnect timers are merged into one ordered loop. Each event
//! is handled to completion and the surface is redrawn if the screen changed.

use crate::{
    api::HttpApi,
    backoff::{jittered_backoff, next_backoff},
    config::ClientConfig,
    events::{self, Sender, Stream},
    screen::{Screen, Surface},
    sync::{Effect, RoundSyncClient},
    Error, Result,
};
use paradrop_types::{
    api::{BalanceResponse, RegisterResponse, TablesResponse},
    Inbound, Number, Outbound,
};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{interval, sleep_until, Instant, MissedTickBehavior},
};
use tokio_tungstenite::MaybeTlsStream;
use tracing::{debug, info, warn};
use url::Url;

type Connection = (Sender<MaybeTlsStream<TcpStream>>, Stream);

/// User input fed to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Select(Number),
    ClearSelection,
    PlaceBet,
    Quit,
}

enum Completion {
    Connected(Result<Connection>),
    Registered(Result<RegisterResponse>),
    Balance(Result<BalanceResponse>),
    Tables(Result<TablesResponse>),
}

pub struct Driver<S: Surface> {
    client: RoundSyncClient,
    api: HttpApi,
    surface: S,
    dial_timeout: Duration,
    poll_interval: Duration,
    reconnect_initial: Duration,
    reconnect_max: Duration,
    started: Instant,
    rng: StdRng,
    completions: mpsc::UnboundedSender<Completion>,
    completions_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    rendered: Option<Screen>,
}

impl<S: Surface> Driver<S> {
    pub fn new(client: RoundSyncClient, api: HttpApi, config: &ClientConfig, surface: S) -> Self {
        let (completions, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            api,
            surface,
            dial_timeout: config.dial_timeout,
            poll_interval: config.poll_interval,
            reconnect_initial: config.reconnect_initial,
            reconnect_max: config.reconnect_max,
            started: Instant::now(),
            rng: StdRng::from_entropy(),
            completions,
            completions_rx: Some(completions_rx),
            rendered: None,
        }
    }

    /// Run until [Command::Quit] arrives or the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        let ws_url = self.api.ws_url()?;
        let mut completions = self
            .completions_rx
            .take()
            .ok_or(Error::ConnectionClosed)?;

        self.register();
        self.dial(&ws_url);
        self.render();

        let mut connection: Option<Connection> = None;
        let mut reconnect_at: Option<Instant> = None;
        let mut backoff = self.reconnect_initial;
        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self
                .client
                .next_deadline()
                .map(|ms| self.started + Duration::from_millis(ms));
            let polling = self.client.tracked_table().is_some() && connection.is_some();

            tokio::select! {
                frame = next_frame(&mut connection) => match frame {
                    Some(Ok(inbound)) => {
                        let now_ms = self.now_ms();
                        let effects = self.client.handle(inbound, now_ms);
                        self.execute(effects, &mut connection).await;
                    }
                    Some(Err(Error::Json(err))) => {
                        debug!(?err, "skipping undecodable frame");
                    }
                    Some(Err(err)) => {
                        warn!(?err, "realtime channel lost");
                        connection = None;
                        self.client.on_disconnected();
                        reconnect_at = Some(self.retry_at(&mut backoff));
                    }
                    None => {
                        warn!("realtime channel ended");
                        connection = None;
                        self.client.on_disconnected();
                        reconnect_at = Some(self.retry_at(&mut backoff));
                    }
                },
                command = commands.recv() => match command {
                    None | Some(Command::Quit) => break,
                    Some(Command::Select(number)) => self.client.select_number(number),
                    Some(Command::ClearSelection) => self.client.clear_selection(),
                    Some(Command::PlaceBet) => {
                        if let Ok(outbound) = self.client.place_bet() {
                            self.send(outbound, &mut connection).await;
                        }
                    }
                },
                Some(completion) = completions.recv() => match completion {
                    Completion::Connected(Ok(established)) => {
                        info!(url = %ws_url, "realtime channel connected");
                        connection = Some(established);
                        backoff = self.reconnect_initial;
                        let effects = self.client.on_connected();
                        self.execute(effects, &mut connection).await;
                    }
                    Completion::Connected(Err(err)) => {
                        warn!(?err, url = %ws_url, "failed to connect");
                        self.client.on_disconnected();
                        reconnect_at = Some(self.retry_at(&mut backoff));
                    }
                    Completion::Registered(response) => {
                        let now_ms = self.now_ms();
                        self.client.on_registered(response, now_ms);
                    }
                    Completion::Balance(response) => {
                        let now_ms = self.now_ms();
                        self.client.on_balance(response, now_ms);
                    }
                    Completion::Tables(response) => {
                        let now_ms = self.now_ms();
                        self.client.on_tables(response, now_ms);
                    }
                },
                _ = sleep_until_some(deadline) => {
                    let now_ms = self.now_ms();
                    self.client.fire_due(now_ms);
                }
                _ = sleep_until_some(reconnect_at) => {
                    reconnect_at = None;
                    self.dial(&ws_url);
                }
                _ = poll.tick(), if polling => self.refresh_table(),
            }

            self.render();
        }

        if let Some((mut sender, _)) = connection {
            if let Err(err) = sender.close().await {
                debug!(?err, "close failed");
            }
        }
        Ok(())
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn retry_at(&mut self, backoff: &mut Duration) -> Instant {
        let delay = jittered_backoff(&mut self.rng, *backoff);
        *backoff = next_backoff(*backoff, self.reconnect_max);
        debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        Instant::now() + delay
    }

    fn render(&mut self) {
        let screen = self.client.screen();
        if self.rendered.as_ref() == Some(screen) {
            return;
        }
        self.surface.render(screen);
        self.rendered = Some(screen.clone());
    }

    async fn execute(&mut self, effects: Vec<Effect>, connection: &mut Option<Connection>) {
        for effect in effects {
            match effect {
                Effect::Send(outbound) => self.send(outbound, connection).await,
                Effect::RefreshBalance => self.refresh_balance(),
                Effect::RefreshTable => self.refresh_table(),
            }
        }
    }

    async fn send(&mut self, outbound: Outbound, connection: &mut Option<Connection>) {
        let Some((sender, _)) = connection.as_mut() else {
            self.client.show_error("Not connected");
            return;
        };
        if let Err(err) = sender.send(&outbound).await {
            warn!(?err, event = outbound.kind(), "failed to send");
            self.client.show_error("Not connected");
        }
    }

    fn dial(&self, url: &Url) {
        let url = url.clone();
        let dial_timeout = self.dial_timeout;
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Connected(events::connect(&url, dial_timeout).await));
        });
    }

    fn register(&self) {
        let api = self.api.clone();
        let identity = self.client.session().identity().clone();
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Registered(api.register(&identity).await));
        });
    }

    fn refresh_balance(&self) {
        let api = self.api.clone();
        let user_id = self.client.session().user_id().to_string();
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Balance(api.balance(&user_id).await));
        });
    }

    fn refresh_table(&self) {
        let api = self.api.clone();
        let game = self.client.game();
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Tables(api.tables(game).await));
        });
    }
}

async fn next_frame(connection: &mut Option<Connection>) -> Option<Result<Inbound>> {
    match connection {
        Some((_, stream)) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use axum::{
        extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade},
        routing::{get, post},
        Json, Router,
    };
    use paradrop_types::GameType;
    use serde_json::{json, Value};
    use std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let actual_addr = listener.local_addr().unwrap();
        let base_url = format!("http://{actual_addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        (base_url, handle)
    }

    /// Minimal game server: answers `join_game` with the table state and
    /// `place_bet` with a debited balance, reporting every request it sees.
    async fn game_socket(mut socket: WebSocket, seen: mpsc::UnboundedSender<Value>) {
        while let Some(Ok(AxumMessage::Text(text))) = socket.recv().await {
            let request: Value = serde_json::from_str(&text).unwrap();
            let reply = match request["event"].as_str() {
                Some("join_game") => json!({
                    "event": "round_data",
                    "data": {
                        "game_type": "platinum",
                        "round_data": {
                            "round_code": "P1",
                            "players": 2,
                            "bets": [{"user_id": "user_9", "number": 5, "username": "Other"}]
                        }
                    }
                }),
                Some("place_bet") => json!({
                    "event": "bet_success",
                    "data": {"new_balance": 9000}
                }),
                _ => continue,
            };
            let _ = seen.send(request);
            if socket
                .send(AxumMessage::Text(reply.to_string()))
                .await
                .is_err()
            {
                return;
            }
        }
    }

    /// Drops the first connection right after its join; later ones get the table.
    async fn flaky_socket(mut socket: WebSocket, attempt: usize, seen: mpsc::UnboundedSender<Value>) {
        while let Some(Ok(AxumMessage::Text(text))) = socket.recv().await {
            let request: Value = serde_json::from_str(&text).unwrap();
            if request["event"] != "join_game" {
                continue;
            }
            let _ = seen.send(request);
            if attempt == 0 {
                let _ = socket.send(AxumMessage::Close(None)).await;
                return;
            }
            let reply = json!({
                "event": "round_data",
                "data": {"round_data": {"round_code": "P7", "players": 1, "bets": []}}
            });
            if socket
                .send(AxumMessage::Text(reply.to_string()))
                .await
                .is_err()
            {
                return;
            }
        }
    }

    async fn wait_for(
        screens: &mut mpsc::UnboundedReceiver<Screen>,
        predicate: impl Fn(&Screen) -> bool,
    ) -> Screen {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let screen = screens.recv().await.unwrap();
                if predicate(&screen) {
                    return screen;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_driver_joins_and_places_bet() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Value>();
        let router = Router::new()
            .route(
                "/ws",
                get(move |ws: WebSocketUpgrade| {
                    let seen_tx = seen_tx.clone();
                    async move { ws.on_upgrade(move |socket| game_socket(socket, seen_tx)) }
                }),
            )
            .route(
                "/register",
                post(|| async { Json(json!({"success": true, "balance": 10000})) }),
            )
            .route(
                "/balance/:user_id",
                get(|| async { Json(json!({"balance": 10000})) }),
            );
        let (base_url, server) = serve_router(router).await;

        let identity = Identity {
            user_id: "user_1".to_string(),
            username: "Player1".to_string(),
        };
        let client = RoundSyncClient::new(GameType::Platinum, identity);
        let api = HttpApi::new(&base_url).unwrap();
        let (screens_tx, mut screens) = mpsc::unbounded_channel::<Screen>();
        let surface = move |screen: &Screen| {
            let _ = screens_tx.send(screen.clone());
        };
        let driver = Driver::new(client, api, &ClientConfig::default(), surface);
        let (commands, commands_rx) = mpsc::channel(16);
        let running = tokio::spawn(driver.run(commands_rx));

        let join = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(join["event"], "join_game");
        assert_eq!(join["data"]["user_id"], "user_1");

        let screen = wait_for(&mut screens, |screen| {
            screen.round_code == "P1" && screen.wallet == 10_000
        })
        .await;
        assert_eq!(screen.slots[0].number, Number::new(5).ok());
        assert!(screen.bet_enabled);

        commands
            .send(Command::Select(Number::new(12).unwrap()))
            .await
            .unwrap();
        commands.send(Command::PlaceBet).await.unwrap();

        let bet = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bet["event"], "place_bet");
        assert_eq!(bet["data"]["number"], 12);
        assert_eq!(bet["data"]["username"], "Player1");

        let screen = wait_for(&mut screens, |screen| screen.wallet == 9_000).await;
        assert_eq!(screen.status.text, "Bet placed successfully!");

        commands.send(Command::Quit).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn test_driver_bet_without_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let identity = Identity {
            user_id: "user_1".to_string(),
            username: "Player1".to_string(),
        };
        let client = RoundSyncClient::new(GameType::Platinum, identity);
        let api = HttpApi::new(&format!("http://{addr}")).unwrap();
        let (screens_tx, mut screens) = mpsc::unbounded_channel::<Screen>();
        let surface = move |screen: &Screen| {
            let _ = screens_tx.send(screen.clone());
        };
        let driver = Driver::new(client, api, &ClientConfig::default(), surface);
        let (commands, commands_rx) = mpsc::channel(16);
        let running = tokio::spawn(driver.run(commands_rx));

        let screen = wait_for(&mut screens, |screen| {
            screen.status.text == "Connection lost, reconnecting"
        })
        .await;
        assert_eq!(screen.wallet, 0);

        // Zero balance: rejected locally before anything is sent.
        commands.send(Command::PlaceBet).await.unwrap();
        wait_for(&mut screens, |screen| {
            screen.status.text == "Insufficient balance"
        })
        .await;

        drop(commands);
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_driver_rejoins_after_disconnect() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Value>();
        let (balance_tx, mut balance_rx) = mpsc::unbounded_channel::<()>();
        let attempts = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/ws",
                get(move |ws: WebSocketUpgrade| {
                    let seen_tx = seen_tx.clone();
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    async move { ws.on_upgrade(move |socket| flaky_socket(socket, attempt, seen_tx)) }
                }),
            )
            .route(
                "/register",
                post(|| async { Json(json!({"success": true, "balance": 10000})) }),
            )
            .route(
                "/balance/:user_id",
                get(move || {
                    let balance_tx = balance_tx.clone();
                    async move {
                        let _ = balance_tx.send(());
                        Json(json!({"balance": 10000}))
                    }
                }),
            );
        let (base_url, server) = serve_router(router).await;

        let identity = Identity {
            user_id: "user_1".to_string(),
            username: "Player1".to_string(),
        };
        let client = RoundSyncClient::new(GameType::Platinum, identity);
        let api = HttpApi::new(&base_url).unwrap();
        let config = ClientConfig {
            reconnect_initial: Duration::from_millis(50),
            ..ClientConfig::default()
        };
        let (screens_tx, mut screens) = mpsc::unbounded_channel::<Screen>();
        let surface = move |screen: &Screen| {
            let _ = screens_tx.send(screen.clone());
        };
        let driver = Driver::new(client, api, &config, surface);
        let (commands, commands_rx) = mpsc::channel(16);
        let running = tokio::spawn(driver.run(commands_rx));

        for _ in 0..2 {
            let join = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(join["event"], "join_game");
            assert_eq!(join["data"]["game_type"], "platinum");
        }

        // Each connection refreshes the wallet.
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), balance_rx.recv())
                .await
                .unwrap()
                .unwrap();
        }

        let screen = wait_for(&mut screens, |screen| {
            screen.round_code == "P7" && screen.wallet == 10_000
        })
        .await;
        assert!(screen.bet_enabled);

        commands.send(Command::Quit).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        server.abort();
    }
}
