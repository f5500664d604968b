//! Server network layer handling UDP communications and world scheduling

use crate::error::GameError;
use crate::records::PlayerRecord;
use crate::signals::ShutdownSignal;
use crate::ticker::{next_tick, SingleShot, Ticker};
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, RecordView};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from the server loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server owning the world and serializing every access to it
pub struct Server {
    socket: Arc<UdpSocket>,
    world: World,
    shutdown: ShutdownSignal,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(addr: &str, world: World) -> ServerResult<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);
        let shutdown = ShutdownSignal::install()?;

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            world,
            shutdown,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Sender that can stop the server loop with `ServerMessage::Shutdown`
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(GameMessage::SendPacket { packet, addr }) = game_rx.recv().await {
                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
        });
    }

    async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> ServerResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Applies one request to the world and builds the reply
    ///
    /// Client errors become `Rejected` replies. Only errors that leave the
    /// world inconsistent are returned.
    pub fn handle_request(&mut self, packet: Packet) -> Result<Packet, GameError> {
        let result = match packet {
            Packet::Join { map_id, user_name } => {
                self.world
                    .join(&map_id, &user_name)
                    .map(|joined| Packet::Joined {
                        token: joined.token.to_string(),
                        player_id: joined.player_id,
                    })
            }
            Packet::Move { token, direction } => self
                .world
                .move_player(&token, &direction)
                .map(|_| Packet::Ack),
            Packet::Tick { time_delta } => self.world.tick(time_delta).map(|_| Packet::Ack),
            Packet::State { token } => self
                .world
                .game_state(&token)
                .map(|(players, loot)| Packet::GameState { players, loot }),
            Packet::Maps => Ok(Packet::MapList {
                maps: self.world.map_summaries(),
            }),
            Packet::Records { start, max_items } => {
                self.world
                    .records(start, max_items)
                    .map(|records| Packet::RecordList {
                        records: records.iter().map(record_view).collect(),
                    })
            }
            _ => Err(GameError::InvalidArgument(
                "Unexpected packet type".to_string(),
            )),
        };

        match result {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("Rejected request: {}", e);
                Ok(Packet::Rejected {
                    code: e.code().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Advances the world by the time measured by the ticker
    ///
    /// Failing to save the world stops the server like a lost evictee does.
    fn apply_update(&mut self, elapsed: Duration) -> Result<(), GameError> {
        match self.world.update(elapsed) {
            Ok(report) => {
                if report.saved {
                    debug!("World saved after {} ms tick", elapsed.as_millis());
                }
                Ok(())
            }
            Err(e) if e.is_fatal() || matches!(e, GameError::Persistence(_)) => Err(e),
            Err(e) => {
                error!("World update failed: {}", e);
                Ok(())
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> ServerResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let settings = self.world.settings().clone();
        let mut ticker = settings.tick_period.map(Ticker::start);
        let mut save_timer = SingleShot::new(settings.save_period.unwrap_or_default());
        if ticker.is_some() && settings.save_period.is_some() && settings.state_file.is_some() {
            save_timer.arm();
        }

        match settings.tick_period {
            Some(period) => info!("Server started, ticking every {} ms", period.as_millis()),
            None => info!("Server started, waiting for manual ticks"),
        }

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            let reply = self.handle_request(packet)?;
                            self.send_packet(reply, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle world tick events
                elapsed = next_tick(&mut ticker) => {
                    self.apply_update(elapsed)?;
                },

                _ = save_timer.fired() => {
                    debug!("Save period elapsed, saving on next tick");
                    self.world.request_save();
                },

                signal = self.shutdown.recv() => {
                    info!("Received {}, shutting down", signal);
                    break;
                },
            }

            if self.world.take_save_rearm() {
                save_timer.arm();
            }
        }

        if self.world.save_state()? {
            info!("Final state saved");
        }
        Ok(())
    }
}

fn record_view(record: &PlayerRecord) -> RecordView {
    RecordView {
        name: record.name.clone(),
        score: record.score,
        play_time: record.play_time_ms as f64 / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_game_config;
    use crate::records::MemoryRecordSink;
    use crate::world::WorldSettings;
    use std::path::Path;
    use crate::snapshot::WorldSnapshot;
    use tokio_test::assert_ok;

    const CONFIG: &str = r#"{
        "maps": [ { "id": "map1", "name": "Map 1", "roads": [ { "x0": 0, "y0": 0, "x1": 10 } ] } ]
    }"#;

    fn test_world(settings: WorldSettings) -> World {
        let config = parse_game_config(CONFIG, Path::new("test.json")).unwrap();
        World::new(config, settings, Box::new(MemoryRecordSink::new()))
    }

    fn join_token(server: &mut Server, name: &str) -> String {
        let reply = server
            .handle_request(Packet::Join {
                map_id: "map1".to_string(),
                user_name: name.to_string(),
            })
            .unwrap();
        match reply {
            Packet::Joined { token, .. } => token,
            other => panic!("Unexpected reply: {:?}", other),
        }
    }

    async fn test_server() -> Server {
        Server::new("127.0.0.1:0", test_world(WorldSettings::default()))
            .await
            .unwrap()
    }

    #[test]
    fn test_record_view_seconds() {
        let view = record_view(&PlayerRecord {
            uuid: uuid::Uuid::new_v4(),
            name: "Rex".to_string(),
            score: 4,
            play_time_ms: 2500,
        });
        assert_eq!(view.play_time, 2.5);
    }

    #[tokio::test]
    async fn test_join_and_state_requests() {
        let mut server = test_server().await;

        let reply = server
            .handle_request(Packet::Join {
                map_id: "map1".to_string(),
                user_name: "Rex".to_string(),
            })
            .unwrap();
        let token = match reply {
            Packet::Joined { token, player_id } => {
                assert_eq!(player_id, 0);
                token
            }
            other => panic!("Unexpected reply: {:?}", other),
        };

        let reply = server.handle_request(Packet::State { token }).unwrap();
        match reply {
            Packet::GameState { players, loot } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].name, "Rex");
                assert!(loot.is_empty());
            }
            other => panic!("Unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejections_carry_codes() {
        let mut server = test_server().await;

        let reply = server
            .handle_request(Packet::Join {
                map_id: "nowhere".to_string(),
                user_name: "Rex".to_string(),
            })
            .unwrap();
        assert!(matches!(reply, Packet::Rejected { ref code, .. } if code == "mapNotFound"));

        let reply = server
            .handle_request(Packet::Move {
                token: "bad".to_string(),
                direction: "U".to_string(),
            })
            .unwrap();
        assert!(matches!(reply, Packet::Rejected { ref code, .. } if code == "invalidToken"));

        let reply = server.handle_request(Packet::Ack).unwrap();
        assert!(matches!(reply, Packet::Rejected { ref code, .. } if code == "invalidArgument"));
    }

    #[tokio::test]
    async fn test_manual_tick_rejected_when_ticking() {
        let world = test_world(WorldSettings {
            tick_period: Some(Duration::from_millis(20)),
            ..WorldSettings::default()
        });
        let mut server = Server::new("127.0.0.1:0", world).await.unwrap();

        let reply = server.handle_request(Packet::Tick { time_delta: 100 }).unwrap();
        assert!(matches!(reply, Packet::Rejected { ref code, .. } if code == "badRequest"));
    }

    #[tokio::test]
    async fn test_udp_roundtrip() {
        let mut server = test_server().await;
        let server_addr = server.local_addr().unwrap();
        let control = server.control();
        let handle = tokio::spawn(async move { server.run().await.is_ok() });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let request = serialize(&Packet::Maps).unwrap();
        client.send_to(&request, server_addr).await.unwrap();

        let mut buffer = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buffer))
            .await
            .unwrap()
            .unwrap();
        let reply: Packet = deserialize(&buffer[..len]).unwrap();
        match reply {
            Packet::MapList { maps } => {
                assert_eq!(maps.len(), 1);
                assert_eq!(maps[0].id, "map1");
            }
            other => panic!("Unexpected reply: {:?}", other),
        }

        assert_ok!(control.send(ServerMessage::Shutdown));
        assert!(handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_drives_world_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("state.bin");
        let world = test_world(WorldSettings {
            tick_period: Some(Duration::from_millis(50)),
            save_period: Some(Duration::from_millis(200)),
            state_file: Some(state_file.clone()),
            ..WorldSettings::default()
        });
        let mut server = Server::new("127.0.0.1:0", world).await.unwrap();

        let token = join_token(&mut server, "Rex");
        let reply = server
            .handle_request(Packet::Move {
                token,
                direction: "R".to_string(),
            })
            .unwrap();
        assert_eq!(reply, Packet::Ack);

        let control = server.control();
        let handle = tokio::spawn(async move {
            let stopped_cleanly = server.run().await.is_ok();
            (stopped_cleanly, server)
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(state_file.exists());
        let saved = assert_ok!(WorldSnapshot::load_from(&state_file));
        assert_eq!(saved.dogs.len(), 1);

        // The save timer is re-armed after each periodic save
        std::fs::remove_file(&state_file).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(state_file.exists());

        assert_ok!(control.send(ServerMessage::Shutdown));
        let (stopped_cleanly, server) = handle.await.unwrap();
        assert!(stopped_cleanly);
        assert!(server.world().find_dog(0).unwrap().position().x > 0.0);
    }

    #[tokio::test]
    async fn test_failed_periodic_save_stops_server() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut world = test_world(WorldSettings {
            tick_period: Some(Duration::from_millis(50)),
            state_file: Some(blocker.join("state.bin")),
            ..WorldSettings::default()
        });
        world.request_save();
        let mut server = Server::new("127.0.0.1:0", world).await.unwrap();

        let result = server.apply_update(Duration::from_millis(50));
        assert!(matches!(result, Err(GameError::Persistence(_))));
    }
}
