//! Integration tests for zenoh-bridge-heatpump.
//!
//! Drive the bridge through its public API against a simulated bus shared
//! with a second master.

use std::sync::Mutex;
use std::time::Duration;

use heatsight_common::{Format, KeyExprBuilder, PointReading, PointValue, decode_auto, encode};
use tokio::sync::mpsc;
use zenoh_bridge_heatpump::HeatPumpBridge;
use zenoh_bridge_heatpump::config::HeatPumpBridgeConfig;
use zenoh_bridge_heatpump::registry::{
    HostRegistry, PointDescriptor, WriteCommand, parse_command_payload,
};
use zenoh_bridge_heatpump::transport::{Transport, TransportError};

/// Register file of a heat pump, busy for the first `busy_exchanges` exchanges.
struct SimulatedPump {
    registers: Mutex<Vec<u16>>,
    busy_exchanges: Mutex<u32>,
    exclusive_flags: Mutex<Vec<bool>>,
}

impl SimulatedPump {
    fn new(busy_exchanges: u32) -> Self {
        let mut registers = vec![0u16; 2100];
        registers[1104..1110].copy_from_slice(&[160, 0, 70, 0, 0, 12]);
        registers[2019..2024].copy_from_slice(&[220, 230, 180, 190, 200]);
        Self {
            registers: Mutex::new(registers),
            busy_exchanges: Mutex::new(busy_exchanges),
            exclusive_flags: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, address: u16) -> u16 {
        self.registers.lock().unwrap()[usize::from(address)]
    }

    fn exchange(&self, exclusive: bool) -> Result<(), TransportError> {
        self.exclusive_flags.lock().unwrap().push(exclusive);
        let mut busy = self.busy_exchanges.lock().unwrap();
        if *busy > 0 {
            *busy -= 1;
            return Err(TransportError::Lock {
                port: "/dev/ttyUSB0".to_string(),
                message: "Device or resource busy".to_string(),
            });
        }
        Ok(())
    }
}

impl Transport for SimulatedPump {
    async fn read_block(
        &self,
        base: u16,
        count: u16,
        exclusive: bool,
    ) -> Result<Vec<u16>, TransportError> {
        self.exchange(exclusive)?;
        let registers = self.registers.lock().unwrap();
        let start = usize::from(base);
        Ok(registers[start..start + usize::from(count)].to_vec())
    }

    async fn write_register(
        &self,
        address: u16,
        value: u16,
        exclusive: bool,
    ) -> Result<(), TransportError> {
        self.exchange(exclusive)?;
        self.registers.lock().unwrap()[usize::from(address)] = value;
        Ok(())
    }
}

/// Registry that encodes readings the way the Zenoh registry does.
#[derive(Default)]
struct WireRegistry {
    descriptors: Mutex<Vec<String>>,
    readings: Mutex<Vec<(String, Vec<u8>)>>,
}

impl WireRegistry {
    fn latest(&self, key: &str) -> Option<PointReading> {
        self.readings
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, payload)| decode_auto(payload).unwrap())
    }
}

impl HostRegistry for WireRegistry {
    async fn create_point(
        &self,
        descriptor: &PointDescriptor,
    ) -> zenoh_bridge_heatpump::Result<()> {
        let json = serde_json::to_string(descriptor).unwrap();
        self.descriptors.lock().unwrap().push(json);
        Ok(())
    }

    async fn update_point(
        &self,
        name: &str,
        value: PointValue,
    ) -> zenoh_bridge_heatpump::Result<()> {
        let keys = KeyExprBuilder::default();
        let reading = PointReading::new("eq2021", name, value);
        let payload = encode(&reading, Format::Cbor)?;
        self.readings
            .lock()
            .unwrap()
            .push((keys.reading("eq2021", name), payload));
        Ok(())
    }
}

fn config() -> HeatPumpBridgeConfig {
    HeatPumpBridgeConfig::parse(
        r#"{
            heatpump: {
                serial: { port: "/dev/ttyUSB0" },
                poll_interval_secs: 10,
                retry: { read_attempts: 2, write_attempts: 3, delay_ms: 200 },
            }
        }"#,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_poll_and_write_through_contended_bus() {
    let config = config();
    let mut bridge = HeatPumpBridge::from_config(
        SimulatedPump::new(0),
        WireRegistry::default(),
        &config.heatpump,
    );

    assert_eq!(bridge.declare_points().await.unwrap(), 8);

    let (tx, rx) = mpsc::channel(8);
    let payload = br#"{"level": 47}"#;
    let level = parse_command_payload(payload).unwrap();
    tx.send(WriteCommand::new("SP_RESISTOR_DELAY", level))
        .await
        .unwrap();

    let _ = tokio::time::timeout(Duration::from_secs(15), bridge.run(rx)).await;

    // Scenario C: 47 minutes -> raw 9
    assert_eq!(bridge.transport().register(1109), 9);

    // Poll after the write reads back the truncated value
    let reading = bridge
        .registry()
        .latest("heatsight/heatpump/eq2021/SP_RESISTOR_DELAY")
        .unwrap();
    assert_eq!(reading.value, PointValue::Minutes(45));

    let air_in = bridge
        .registry()
        .latest("heatsight/heatpump/eq2021/TEMP_AIR_IN")
        .unwrap();
    assert_eq!(air_in.value, PointValue::Celsius(80.0));
    assert_eq!(air_in.source, "eq2021");
}

#[tokio::test(start_paused = true)]
async fn test_second_master_holding_port_delays_but_does_not_lose_data() {
    let config = config();
    // The other master holds the port for the whole first cycle (2 attempts).
    let mut bridge = HeatPumpBridge::from_config(
        SimulatedPump::new(2),
        WireRegistry::default(),
        &config.heatpump,
    );
    let (_tx, rx) = mpsc::channel::<WriteCommand>(1);

    let _ = tokio::time::timeout(Duration::from_secs(11), bridge.run(rx)).await;
    assert!(bridge.registry().readings.lock().unwrap().is_empty());
    assert!(bridge.scheduler().state().current_period_secs() > 10);

    let (_tx, rx) = mpsc::channel::<WriteCommand>(1);
    let _ = tokio::time::timeout(Duration::from_secs(20), bridge.run(rx)).await;
    assert!(
        bridge
            .registry()
            .latest("heatsight/heatpump/eq2021/TEMP_COIL")
            .is_some()
    );
    assert_eq!(bridge.scheduler().state().current_period_secs(), 10);

    // Exclusive lock requested on every attempt but the last of each retry run
    let flags = bridge.transport().exclusive_flags.lock().unwrap().clone();
    assert_eq!(&flags[..2], [true, false]);
}

#[tokio::test]
async fn test_descriptors_in_configured_language() {
    let config = HeatPumpBridgeConfig::parse(
        r#"{ heatpump: { serial: { port: "/dev/ttyUSB0" }, language: "it-IT" } }"#,
    )
    .unwrap();
    let bridge = HeatPumpBridge::from_config(
        SimulatedPump::new(0),
        WireRegistry::default(),
        &config.heatpump,
    );

    bridge.declare_points().await.unwrap();

    let descriptors = bridge.registry().descriptors.lock().unwrap().clone();
    assert!(descriptors.iter().any(|d| d.contains("Termostato ACS")));
    assert!(descriptors.iter().all(|d| !d.contains("SetPoint Hot Water")));
}
