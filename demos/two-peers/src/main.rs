//! SceneSync Two-Peer Demo
//!
//! Two simulated devices on loopback UDP:
//! - Alice places markers, Bob sees them
//! - Bob saves his map, Alice is re-seeded from it
//! - Bob restarts and reloads the map from disk
//!
//! Pass a JSON config path as the first argument to override defaults.

use std::path::PathBuf;
use std::time::Duration;

use scenesync_core::{Color, ScreenPoint, TrackingState};
use scenesync_runtime::{
    init_tracing, Controller, ControllerConfig, ControllerHandle, LogFormat, Notification,
};
use scenesync_store::{FileFlagStore, FlagStore, MapStore, DEFAULT_FLAGS_FILE};
use scenesync_test::network_test::loopback_pair;
use scenesync_test::{SimTrackingEngine, VIEWPORT};
use scenesync_transport::UdpPeerTransport;

type DemoController = Controller<SimTrackingEngine, UdpPeerTransport, MapStore>;

fn demo_config() -> Result<ControllerConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    };
    if config.data_dir.is_none() {
        config.data_dir = Some(std::env::temp_dir().join("scenesync-demo"));
    }
    Ok(config)
}

fn device_config(base: &ControllerConfig, name: &str) -> ControllerConfig {
    let mut config = base.clone();
    config.data_dir = base.data_dir.as_ref().map(|dir| dir.join(name));
    config
}

fn flags_path(config: &ControllerConfig) -> PathBuf {
    config
        .data_dir
        .clone()
        .unwrap_or_default()
        .join(DEFAULT_FLAGS_FILE)
}

fn print_notifications(name: &str, controller: &mut DemoController) {
    while let Some(notification) = controller.pop_notification() {
        match notification {
            Notification::PayloadDiscarded { .. } | Notification::SaveFailed(_) => {
                println!("   [{}] ! {}", name, notification)
            }
            _ => println!("   [{}] {}", name, notification),
        }
    }
}

async fn pause_for_network() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

fn spawn_device(
    name: &str,
    transport: UdpPeerTransport,
    config: ControllerConfig,
) -> Result<(tokio::task::JoinHandle<DemoController>, ControllerHandle), Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    let flags = FileFlagStore::open(flags_path(&config));
    if flags.first_launch() {
        println!("   [{}] first launch: showing onboarding", name);
    }

    let (mut controller, handle) = Controller::new(SimTrackingEngine::mapped(), transport, store, config);
    controller = controller.with_flags(flags);
    controller.complete_onboarding()?;

    let _receiver = controller.transport().start_receive_loop(handle.clone());
    Ok((tokio::spawn(controller.run()), handle))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::Pretty);

    println!("=== SceneSync Two-Peer Demo ===\n");
    let config = demo_config()?;

    // 1. Devices
    println!("1. Connecting devices over loopback UDP...");
    let (alice_transport, bob_transport) = loopback_pair(("alice", "bob")).await?;
    println!("   Alice on {}", alice_transport.local_addr());
    println!("   Bob   on {}", bob_transport.local_addr());

    let bob_config = device_config(&config, "bob");
    let (alice_task, alice) = spawn_device("alice", alice_transport, device_config(&config, "alice"))?;
    let (bob_task, bob) = spawn_device("bob", bob_transport, bob_config.clone())?;
    alice.start()?;
    bob.start()?;

    // 2. Markers
    println!("\n2. Alice taps the screen three times, Bob once");
    let (w, h) = VIEWPORT;
    for (i, color) in [Color::RED, Color::GREEN, Color::BLUE].into_iter().enumerate() {
        let point = ScreenPoint::new(w * (i as f32 + 1.0) / 4.0, h / 2.0);
        alice.create_marker_at_touch(point, color, 0.05)?;
    }
    bob.create_marker_at_touch(ScreenPoint::new(w / 2.0, h / 3.0), Color::YELLOW, 0.05)?;
    pause_for_network().await;

    // 3. Save and share
    println!("\n3. Bob saves his map; Alice adopts it");
    bob.save()?;
    pause_for_network().await;

    alice.shutdown()?;
    bob.shutdown()?;
    let mut alice_controller = alice_task.await?;
    let mut bob_controller = bob_task.await?;

    print_notifications("alice", &mut alice_controller);
    print_notifications("bob", &mut bob_controller);
    println!("   Alice: {}", alice_controller.status());
    println!("   Bob:   {}", bob_controller.status());

    // 4. Restart
    println!("\n4. Bob restarts and reloads from disk");
    let peers = bob_controller.connected_peers();
    drop(bob_controller);

    let transport = UdpPeerTransport::bind(([127, 0, 0, 1], 0).into()).await?;
    let (mut bob_controller, _bob) = Controller::new(
        SimTrackingEngine::mapped(),
        transport,
        bob_config.open_store()?,
        bob_config,
    );
    bob_controller.start();
    if bob_controller.persistence_exists() {
        bob_controller.load()?;
    }
    print_notifications("bob", &mut bob_controller);

    let seeded = bob_controller.state() == TrackingState::TrackingSeeded;
    println!("   Bob seeded from disk: {}", seeded);
    println!("   Bob previously saw {} peer(s)", peers.len());
    println!("   Stats: {:?}", bob_controller.stats());

    println!("\n=== Demo Complete ===");
    Ok(())
}
