// Windows backends via WMI (Win32_* classes).
//
// A connection is opened per call: callers run these methods from blocking
// worker threads, and a WMI connection is tied to the COM apartment of the
// thread that created it.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use wmi::{COMLibrary, WMIConnection};

use super::{BoardBackend, CpuExt, CpuExtension, GpuFallback, LinkStats, MemoryModuleSource, NetExt};
use crate::collectors::SourceOutcome;
use crate::collectors::board::normalize_wmi_release_date;
use crate::collectors::memory::decode_smbios_memory_type;
use crate::models::{
    BiosFacts, GpuDevice, GpuSource, MemoryModule, MotherboardBiosFacts, MotherboardFacts,
    NetworkInterface,
};

fn open_wmi() -> Result<WMIConnection, wmi::WMIError> {
    let com = COMLibrary::new()?;
    WMIConnection::new(com)
}

fn wmi_rows<T: serde::de::DeserializeOwned>(query: &str) -> SourceOutcome<Vec<T>> {
    let conn = match open_wmi() {
        Ok(conn) => conn,
        Err(e) => return SourceOutcome::Failed(format!("wmi: {}", e)),
    };
    match conn.raw_query::<T>(query) {
        Ok(rows) if rows.is_empty() => SourceOutcome::Unavailable,
        Ok(rows) => SourceOutcome::Yielded(rows),
        Err(e) => SourceOutcome::Failed(format!("{}: {}", query, e)),
    }
}

fn none_if_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32Processor {
    name: Option<String>,
    stepping: Option<String>,
    revision: Option<u16>,
    l2_cache_size: Option<u32>,
    l3_cache_size: Option<u32>,
    max_clock_speed: Option<u32>,
    ext_clock: Option<u32>,
}

pub(super) struct WindowsCpuExt;

impl CpuExt for WindowsCpuExt {
    fn cpu_extension(&self) -> SourceOutcome<CpuExtension> {
        let query = "SELECT Name, Stepping, Revision, L2CacheSize, L3CacheSize, MaxClockSpeed, \
                     ExtClock FROM Win32_Processor";
        let rows: Vec<Win32Processor> = match wmi_rows(query) {
            SourceOutcome::Yielded(rows) => rows,
            SourceOutcome::Unavailable => return SourceOutcome::Unavailable,
            SourceOutcome::Failed(reason) => return SourceOutcome::Failed(reason),
        };
        let Some(p) = rows.into_iter().next() else {
            return SourceOutcome::Unavailable;
        };
        SourceOutcome::Yielded(CpuExtension {
            name: none_if_blank(p.name),
            stepping: none_if_blank(p.stepping),
            model: None,
            family: None,
            revision: p.revision,
            l2_cache_size: p.l2_cache_size.filter(|&kb| kb > 0).map(|kb| format!("{} KB", kb)),
            l3_cache_size: p.l3_cache_size.filter(|&kb| kb > 0).map(|kb| format!("{} KB", kb)),
            base_freq_mhz: None,
            max_freq_mhz: p.max_clock_speed.filter(|&mhz| mhz > 0).map(f64::from),
            ext_clock_mhz: p.ext_clock.filter(|&mhz| mhz > 0),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32PhysicalMemory {
    capacity: Option<u64>,
    speed: Option<u32>,
    configured_clock_speed: Option<u32>,
    manufacturer: Option<String>,
    part_number: Option<String>,
    serial_number: Option<String>,
    bank_label: Option<String>,
    device_locator: Option<String>,
    #[serde(rename = "SMBIOSMemoryType")]
    smbios_memory_type: Option<u32>,
    form_factor: Option<u32>,
    type_detail: Option<u32>,
    data_width: Option<u32>,
    total_width: Option<u32>,
}

pub(super) struct WindowsMemoryModules;

impl MemoryModuleSource for WindowsMemoryModules {
    fn physical_modules(&self) -> SourceOutcome<Vec<MemoryModule>> {
        let query = "SELECT Capacity, Speed, ConfiguredClockSpeed, Manufacturer, PartNumber, \
                     SerialNumber, BankLabel, DeviceLocator, SMBIOSMemoryType, FormFactor, \
                     TypeDetail, DataWidth, TotalWidth FROM Win32_PhysicalMemory";
        wmi_rows(query).map(|rows: Vec<Win32PhysicalMemory>| {
            rows.into_iter()
                .map(|m| MemoryModule {
                    capacity_bytes: m.capacity.unwrap_or(0),
                    speed_mhz: m.speed.filter(|&mhz| mhz > 0),
                    configured_speed_mhz: m.configured_clock_speed.filter(|&mhz| mhz > 0),
                    manufacturer: none_if_blank(m.manufacturer),
                    part_number: none_if_blank(m.part_number),
                    serial: none_if_blank(m.serial_number),
                    bank: none_if_blank(m.bank_label),
                    slot: none_if_blank(m.device_locator),
                    smbios_memory_type: m.smbios_memory_type,
                    ddr: m
                        .smbios_memory_type
                        .and_then(decode_smbios_memory_type)
                        .map(str::to_string),
                    form_factor: m.form_factor,
                    type_detail: m.type_detail,
                    data_width: m.data_width,
                    total_width: m.total_width,
                })
                .collect()
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32BaseBoard {
    manufacturer: Option<String>,
    product: Option<String>,
    serial_number: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32Bios {
    manufacturer: Option<String>,
    #[serde(rename = "SMBIOSBIOSVersion")]
    smbios_bios_version: Option<String>,
    release_date: Option<String>,
    version: Option<String>,
}

pub(super) struct WindowsBoardBackend;

#[async_trait]
impl BoardBackend for WindowsBoardBackend {
    async fn board_facts(&self) -> SourceOutcome<MotherboardBiosFacts> {
        match tokio::task::spawn_blocking(query_board_and_bios).await {
            Ok(outcome) => outcome,
            Err(e) => SourceOutcome::Failed(format!("wmi board task join: {}", e)),
        }
    }
}

fn query_board_and_bios() -> SourceOutcome<MotherboardBiosFacts> {
    let mut facts = MotherboardBiosFacts::default();

    let boards = "SELECT Manufacturer, Product, SerialNumber, Version FROM Win32_BaseBoard";
    match wmi_rows::<Win32BaseBoard>(boards) {
        SourceOutcome::Yielded(rows) => {
            if let Some(b) = rows.into_iter().next() {
                facts.motherboard = Some(MotherboardFacts {
                    manufacturer: none_if_blank(b.manufacturer),
                    product: none_if_blank(b.product),
                    serial_number: none_if_blank(b.serial_number),
                    version: none_if_blank(b.version),
                });
            }
        }
        SourceOutcome::Failed(reason) => debug!(reason = %reason, "Win32_BaseBoard query failed"),
        SourceOutcome::Unavailable => {}
    }

    let bios = "SELECT Manufacturer, SMBIOSBIOSVersion, ReleaseDate, Version FROM Win32_BIOS";
    match wmi_rows::<Win32Bios>(bios) {
        SourceOutcome::Yielded(rows) => {
            if let Some(bi) = rows.into_iter().next() {
                let release_date = none_if_blank(bi.release_date)
                    .map(|raw| normalize_wmi_release_date(&raw).unwrap_or(raw));
                facts.bios = Some(BiosFacts {
                    manufacturer: none_if_blank(bi.manufacturer),
                    smbios_version: none_if_blank(bi.smbios_bios_version),
                    release_date,
                    version: none_if_blank(bi.version),
                });
            }
        }
        SourceOutcome::Failed(reason) => debug!(reason = %reason, "Win32_BIOS query failed"),
        SourceOutcome::Unavailable => {}
    }

    if facts.is_empty() {
        SourceOutcome::Unavailable
    } else {
        SourceOutcome::Yielded(facts)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32VideoController {
    name: Option<String>,
    driver_version: Option<String>,
    #[serde(rename = "AdapterRAM")]
    adapter_ram: Option<u32>,
    #[serde(rename = "PNPDeviceID")]
    pnp_device_id: Option<String>,
}

pub(super) struct WindowsGpuFallback;

impl GpuFallback for WindowsGpuFallback {
    fn enumerate_controllers(&self) -> SourceOutcome<Vec<GpuDevice>> {
        let query =
            "SELECT Name, DriverVersion, AdapterRAM, PNPDeviceID FROM Win32_VideoController";
        wmi_rows(query).map(|rows: Vec<Win32VideoController>| {
            rows.into_iter()
                .map(|v| GpuDevice {
                    name: none_if_blank(v.name),
                    driver: none_if_blank(v.driver_version),
                    memory_total_bytes: v.adapter_ram.filter(|&b| b > 0).map(u64::from),
                    pnp_id: none_if_blank(v.pnp_device_id),
                    ..GpuDevice::empty(GpuSource::Wmi)
                })
                .collect()
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Win32NetworkAdapterConfiguration {
    description: Option<String>,
    caption: Option<String>,
    service_name: Option<String>,
    #[serde(rename = "MACAddress")]
    mac_address: Option<String>,
    #[serde(rename = "IPAddress")]
    ip_address: Option<Vec<String>>,
}

pub(super) struct WindowsNetExt;

impl NetExt for WindowsNetExt {
    fn link_stats(&self, _interface: &str) -> LinkStats {
        // Not exposed through the enumeration source on this platform; the
        // enrichment pass below carries what the adapter records offer.
        LinkStats::default()
    }

    fn enrich(&self, interfaces: &mut Vec<NetworkInterface>) {
        let query = "SELECT Description, Caption, ServiceName, MACAddress, IPAddress \
                     FROM Win32_NetworkAdapterConfiguration WHERE IPEnabled = TRUE";
        let rows: Vec<Win32NetworkAdapterConfiguration> = match wmi_rows(query) {
            SourceOutcome::Yielded(rows) => rows,
            SourceOutcome::Unavailable => return,
            SourceOutcome::Failed(reason) => {
                debug!(reason = %reason, "adapter configuration query failed");
                return;
            }
        };

        for nic in rows {
            let name = none_if_blank(nic.description)
                .or_else(|| none_if_blank(nic.caption))
                .or_else(|| none_if_blank(nic.service_name));
            let mac = none_if_blank(nic.mac_address);
            let ips = nic.ip_address.unwrap_or_default();

            // Match by MAC first, then by fuzzy name containment either way.
            let mut idx = mac.as_ref().and_then(|m| {
                interfaces
                    .iter()
                    .position(|it| it.mac.as_deref().is_some_and(|x| x.eq_ignore_ascii_case(m)))
            });
            if idx.is_none() {
                if let Some(n) = &name {
                    idx = interfaces.iter().position(|it| {
                        !it.name.is_empty() && (n.contains(&it.name) || it.name.contains(n.as_str()))
                    });
                }
            }
            let idx = match idx {
                Some(i) => i,
                None => {
                    interfaces.push(NetworkInterface {
                        name: name.unwrap_or_else(|| "WMI_NIC".to_string()),
                        ..NetworkInterface::default()
                    });
                    interfaces.len() - 1
                }
            };

            let row = &mut interfaces[idx];
            if row.mac.is_none() {
                row.mac = mac;
            }
            let v4: Vec<String> = ips
                .into_iter()
                .filter(|ip| !ip.is_empty() && !ip.contains(':'))
                .collect();
            if !v4.is_empty() {
                for ip in v4 {
                    if !row.ipv4.contains(&ip) {
                        row.ipv4.push(ip);
                    }
                }
                row.ipv4.sort();
            }
        }
    }
}
