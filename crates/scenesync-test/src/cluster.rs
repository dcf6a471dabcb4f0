//! Simulated devices sharing a mesh

use scenesync_core::{MarkerId, PeerId};
use scenesync_runtime::{Controller, ControllerConfig, ControllerHandle};

use crate::chaos::ChaosConfig;
use crate::engine::SimTrackingEngine;
use crate::mesh::{MeshNetwork, MeshTransport};
use crate::store::MemoryStore;

/// Controller wired to simulated collaborators
pub type SimController = Controller<SimTrackingEngine, MeshTransport, MemoryStore>;

/// Upper bound on pump/tick rounds in `settle`
const MAX_SETTLE_ROUNDS: usize = 64;

/// One simulated device
pub struct SimDevice {
    pub name: String,
    pub controller: SimController,
    pub handle: ControllerHandle,
    /// Same disk the controller writes to
    pub store: MemoryStore,
}

impl SimDevice {
    fn boot(
        name: &str,
        transport: MeshTransport,
        store: MemoryStore,
        config: ControllerConfig,
    ) -> Self {
        let network = transport.network().clone();
        let id = transport.id();
        let (mut controller, handle) =
            Controller::new(SimTrackingEngine::mapped(), transport, store.clone(), config);
        network.attach(id, handle.clone());
        controller.start();

        SimDevice {
            name: name.to_string(),
            controller,
            handle,
            store,
        }
    }

    /// Identity other devices see this one as
    pub fn id(&self) -> PeerId {
        self.controller.transport().id()
    }

    pub fn engine_mut(&mut self) -> &mut SimTrackingEngine {
        self.controller.engine_mut()
    }

    pub fn marker_ids(&self) -> Vec<MarkerId> {
        self.controller.markers().map(|m| m.record.id()).collect()
    }
}

/// A set of devices on one mesh
pub struct Cluster {
    network: MeshNetwork,
    devices: Vec<SimDevice>,
    config: ControllerConfig,
}

impl Cluster {
    /// Started, fully connected devices with mapped engines
    pub fn new(names: &[&str], chaos: ChaosConfig) -> Self {
        Self::with_config(names, chaos, ControllerConfig::default())
    }

    pub fn with_config(names: &[&str], chaos: ChaosConfig, config: ControllerConfig) -> Self {
        let network = MeshNetwork::with_seed(chaos, 0x5EED);
        let devices = names
            .iter()
            .map(|name| {
                let transport = network.join(*name);
                SimDevice::boot(name, transport, MemoryStore::new(), config.clone())
            })
            .collect();
        network.connect_all();

        Cluster {
            network,
            devices,
            config,
        }
    }

    pub fn network(&self) -> &MeshNetwork {
        &self.network
    }

    pub fn device(&self, index: usize) -> &SimDevice {
        &self.devices[index]
    }

    pub fn device_mut(&mut self, index: usize) -> &mut SimDevice {
        &mut self.devices[index]
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Pump the mesh and tick every device until nothing moves
    pub fn settle(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut moved = self.network.pump();
            for device in &mut self.devices {
                moved += device.controller.tick();
            }
            if moved == 0 {
                break;
            }
            total += moved;
        }
        total
    }

    /// Rebuild a device against the same disk and mesh identity
    pub fn restart(&mut self, index: usize) {
        let old = &self.devices[index];
        let transport = old.controller.transport().clone();
        let store = old.store.clone();
        let name = old.name.clone();

        tracing::debug!(device = %name, "restarting device");
        self.devices[index] = SimDevice::boot(&name, transport, store, self.config.clone());
    }
}
