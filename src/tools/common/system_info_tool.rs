//! System information tool
//!
//! Reads `/proc` and `/sys` on Linux and shells out to `uname`, `df`, `ps`,
//! `sysctl` and `pmset` elsewhere. Parsers are kept free of I/O so they can
//! be tested against captured output.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::time::timeout;

use super::file_tool::format_size;
use crate::core::ToolError;
use crate::tools::tool::{parse_params, Params, Tool, ToolAction, ToolCategory, ToolMetadata, ToolOutput};

/// Timeout for helper commands
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
/// Gap between the two `/proc/stat` samples
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);
/// Default number of processes returned
const DEFAULT_PROCESS_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemInfoAction {
    Overview,
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
    Battery,
    Uptime,
    Performance,
    Hardware,
}

impl ToolAction for SystemInfoAction {
    const ALL: &'static [Self] = &[
        SystemInfoAction::Overview,
        SystemInfoAction::Cpu,
        SystemInfoAction::Memory,
        SystemInfoAction::Disk,
        SystemInfoAction::Network,
        SystemInfoAction::Processes,
        SystemInfoAction::Battery,
        SystemInfoAction::Uptime,
        SystemInfoAction::Performance,
        SystemInfoAction::Hardware,
    ];
    const DEFAULT: Self = SystemInfoAction::Overview;

    fn as_str(&self) -> &'static str {
        match self {
            SystemInfoAction::Overview => "overview",
            SystemInfoAction::Cpu => "cpu",
            SystemInfoAction::Memory => "memory",
            SystemInfoAction::Disk => "disk",
            SystemInfoAction::Network => "network",
            SystemInfoAction::Processes => "processes",
            SystemInfoAction::Battery => "battery",
            SystemInfoAction::Uptime => "uptime",
            SystemInfoAction::Performance => "performance",
            SystemInfoAction::Hardware => "hardware",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProcessesInput {
    sort_by: Option<String>,
    limit: Option<usize>,
}

/// One row of `ps` output
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub name: String,
}

/// Memory figures in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemoryStats {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round1(self.used() as f64 * 100.0 / self.total as f64)
    }
}

/// System information tool
pub struct SystemInfoTool {
    metadata: ToolMetadata,
}

impl SystemInfoTool {
    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata::new(
                "system_info_tool",
                "Report CPU, memory, disk, network, process, battery, uptime and hardware information",
                ToolCategory::System,
            )
            .with_permissions(["system_info"]),
        }
    }

    async fn overview(&self) -> Result<ToolOutput, ToolError> {
        let mut output = ToolOutput::new("System overview retrieved successfully")
            .with("hostname", hostname().await)
            .with("os", command_output("uname", &["-s"]).await.ok().map(|s| s.trim().to_string()))
            .with("kernel", command_output("uname", &["-r"]).await.ok().map(|s| s.trim().to_string()))
            .with("platform", crate::core::Platform::current().as_str())
            .with("architecture", std::env::consts::ARCH)
            .with("cpu_count", logical_cpus());

        if let Ok(memory) = memory_stats().await {
            output = output
                .with("memory_total", memory.total)
                .with("memory_percent", memory.percent());
        }
        if let Ok(seconds) = uptime_seconds().await {
            output = output
                .with("uptime_seconds", seconds)
                .with("uptime_formatted", format_uptime(seconds));
        }
        Ok(output)
    }

    async fn cpu(&self) -> Result<ToolOutput, ToolError> {
        let mut output = ToolOutput::new("CPU information retrieved successfully")
            .with("logical_cores", logical_cpus())
            .with("model", cpu_model().await);

        if cfg!(target_os = "linux") {
            output = output.with("usage_percent", sample_cpu_usage().await?);
        }
        if let Ok(load) = load_average().await {
            output = output.with("load_average", load.to_vec());
        }
        Ok(output)
    }

    async fn memory(&self) -> Result<ToolOutput, ToolError> {
        let memory = memory_stats().await?;
        Ok(ToolOutput::new("Memory information retrieved successfully")
            .with("total", memory.total)
            .with("available", memory.available)
            .with("used", memory.used())
            .with("percent", memory.percent())
            .with("total_human", format_size(memory.total))
            .with("available_human", format_size(memory.available))
            .with("swap_total", memory.swap_total)
            .with("swap_used", memory.swap_total.saturating_sub(memory.swap_free)))
    }

    async fn disk(&self) -> Result<ToolOutput, ToolError> {
        let raw = command_output("df", &["-kP"]).await?;
        let disks = parse_df(&raw);
        Ok(ToolOutput::new(format!("Disk information for {} filesystems", disks.len()))
            .with("count", disks.len())
            .with("disks", disks))
    }

    async fn network(&self) -> Result<ToolOutput, ToolError> {
        let raw = read_system_file("/proc/net/dev", "network").await?;
        let interfaces = parse_net_dev(&raw);
        Ok(ToolOutput::new("Network information retrieved successfully")
            .with("count", interfaces.len())
            .with("interfaces", interfaces))
    }

    async fn processes(&self, input: ProcessesInput) -> Result<ToolOutput, ToolError> {
        let sort_by = input.sort_by.unwrap_or_else(|| "cpu".to_string());
        let limit = input.limit.unwrap_or(DEFAULT_PROCESS_LIMIT);

        let raw = command_output("ps", &["-axo", "pid=,pcpu=,pmem=,comm="]).await?;
        let mut rows = parse_ps(&raw);
        sort_processes(&mut rows, &sort_by);
        rows.truncate(limit);

        let processes: Vec<Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "pid": row.pid,
                    "name": row.name,
                    "cpu_percent": row.cpu_percent,
                    "memory_percent": row.memory_percent,
                })
            })
            .collect();

        Ok(
            ToolOutput::new(format!("Retrieved {} processes sorted by {}", processes.len(), sort_by))
                .with("count", processes.len())
                .with("processes", processes)
                .with("sort_by", sort_by)
                .with("limit", limit),
        )
    }

    async fn battery(&self) -> Result<ToolOutput, ToolError> {
        let battery = if cfg!(target_os = "macos") {
            command_output("pmset", &["-g", "batt"])
                .await
                .ok()
                .and_then(|raw| parse_pmset(&raw))
        } else {
            linux_battery().await
        };

        match battery {
            Some((percent, status)) => Ok(ToolOutput::new("Battery information retrieved successfully")
                .with("available", true)
                .with("percent", percent)
                .with("power_plugged", status != "discharging")
                .with("status", status)),
            None => Ok(ToolOutput::new("No battery detected").with("available", false)),
        }
    }

    async fn uptime(&self) -> Result<ToolOutput, ToolError> {
        let seconds = uptime_seconds().await?;
        let boot_time = Local
            .timestamp_opt(Local::now().timestamp() - seconds as i64, 0)
            .single()
            .map(|t| t.to_rfc3339());

        Ok(ToolOutput::new("Uptime information retrieved successfully")
            .with("boot_time", boot_time)
            .with("uptime_seconds", seconds)
            .with("uptime_days", seconds / 86_400)
            .with("uptime_hours", (seconds % 86_400) / 3_600)
            .with("uptime_minutes", (seconds % 3_600) / 60)
            .with("uptime_formatted", format_uptime(seconds)))
    }

    async fn performance(&self) -> Result<ToolOutput, ToolError> {
        let mut output = ToolOutput::new("Performance metrics retrieved successfully")
            .with("cpu_count", logical_cpus());

        if let Ok(load) = load_average().await {
            let per_core = round1(load[0] / logical_cpus().max(1) as f64 * 100.0);
            output = output
                .with("load_average", load.to_vec())
                .with("load_percent", per_core);
        }
        if cfg!(target_os = "linux") {
            if let Ok(usage) = sample_cpu_usage().await {
                output = output.with("cpu_percent", usage);
            }
        }
        if let Ok(memory) = memory_stats().await {
            output = output.with("memory_percent", memory.percent());
        }
        if let Ok(raw) = command_output("ps", &["-axo", "pid="]).await {
            output = output.with("process_count", raw.lines().filter(|l| !l.trim().is_empty()).count());
        }
        Ok(output)
    }

    async fn hardware(&self) -> Result<ToolOutput, ToolError> {
        let mut output = ToolOutput::new("Hardware information retrieved successfully")
            .with("architecture", std::env::consts::ARCH)
            .with("logical_cores", logical_cpus())
            .with("cpu_model", cpu_model().await);

        if let Ok(memory) = memory_stats().await {
            output = output
                .with("memory_total", memory.total)
                .with("memory_total_human", format_size(memory.total));
        }

        if cfg!(target_os = "linux") {
            for (key, file) in [
                ("vendor", "/sys/class/dmi/id/sys_vendor"),
                ("model", "/sys/class/dmi/id/product_name"),
                ("bios_version", "/sys/class/dmi/id/bios_version"),
            ] {
                if let Ok(value) = tokio::fs::read_to_string(file).await {
                    output = output.with(key, value.trim());
                }
            }
        } else if cfg!(target_os = "macos") {
            if let Ok(model) = command_output("sysctl", &["-n", "hw.model"]).await {
                output = output.with("model", model.trim());
            }
        }
        Ok(output)
    }
}

impl Default for SystemInfoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SystemInfoTool {
    type Action = SystemInfoAction;

    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn run(&self, action: SystemInfoAction, params: &Params) -> Result<ToolOutput, ToolError> {
        tracing::info!("[SystemInfoTool] {}", action.as_str());
        let result = match action {
            SystemInfoAction::Overview => self.overview().await,
            SystemInfoAction::Cpu => self.cpu().await,
            SystemInfoAction::Memory => self.memory().await,
            SystemInfoAction::Disk => self.disk().await,
            SystemInfoAction::Network => self.network().await,
            SystemInfoAction::Processes => self.processes(parse_params(params)?).await,
            SystemInfoAction::Battery => self.battery().await,
            SystemInfoAction::Uptime => self.uptime().await,
            SystemInfoAction::Performance => self.performance().await,
            SystemInfoAction::Hardware => self.hardware().await,
        };

        result.map_err(|e| match e {
            ToolError::Io(io) => ToolError::failed(
                format!("Failed to get {} information", action.as_str()),
                io.to_string(),
            ),
            other => other,
        })
    }
}

async fn command_output(program: &str, args: &[&str]) -> Result<String, ToolError> {
    tracing::debug!("[SystemInfoTool] Running {} {}", program, args.join(" "));

    let future = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = match timeout(COMMAND_TIMEOUT, future).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ToolError::failed(
                format!("{} timed out", program),
                format!("Command timed out after {}s", COMMAND_TIMEOUT.as_secs()),
            ))
        }
    };

    if !output.status.success() {
        return Err(ToolError::failed(
            format!("{} failed", program),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

async fn read_system_file(path: &str, what: &str) -> Result<String, ToolError> {
    if !Path::new(path).exists() {
        return Err(ToolError::failed(
            format!("{} information is not available on this platform", capitalize(what)),
            format!("Unsupported platform: {} not found", path),
        ));
    }
    Ok(tokio::fs::read_to_string(path).await?)
}

async fn hostname() -> Option<String> {
    if let Ok(name) = tokio::fs::read_to_string("/proc/sys/kernel/hostname").await {
        return Some(name.trim().to_string());
    }
    command_output("uname", &["-n"]).await.ok().map(|s| s.trim().to_string())
}

fn logical_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

async fn cpu_model() -> Option<String> {
    if cfg!(target_os = "macos") {
        return command_output("sysctl", &["-n", "machdep.cpu.brand_string"])
            .await
            .ok()
            .map(|s| s.trim().to_string());
    }
    let raw = tokio::fs::read_to_string("/proc/cpuinfo").await.ok()?;
    parse_cpuinfo_model(&raw)
}

async fn memory_stats() -> Result<MemoryStats, ToolError> {
    if cfg!(target_os = "macos") {
        let unexpected = |what: &str| ToolError::failed("Failed to get memory information", format!("Unexpected {} output", what));
        let total = command_output("sysctl", &["-n", "hw.memsize"])
            .await?
            .trim()
            .parse()
            .map_err(|_| unexpected("sysctl hw.memsize"))?;
        let available = parse_vm_stat(&command_output("vm_stat", &[]).await?).ok_or_else(|| unexpected("vm_stat"))?;
        let (swap_total, swap_free) = parse_swapusage(&command_output("sysctl", &["-n", "vm.swapusage"]).await?)
            .ok_or_else(|| unexpected("sysctl vm.swapusage"))?;
        return Ok(MemoryStats {
            total,
            available,
            swap_total,
            swap_free,
        });
    }

    let raw = read_system_file("/proc/meminfo", "memory").await?;
    parse_meminfo(&raw).ok_or_else(|| ToolError::failed("Failed to get memory information", "Unexpected /proc/meminfo format"))
}

async fn uptime_seconds() -> Result<u64, ToolError> {
    if cfg!(target_os = "macos") {
        let raw = command_output("sysctl", &["-n", "kern.boottime"]).await?;
        let boot = parse_boottime(&raw)
            .ok_or_else(|| ToolError::failed("Failed to get uptime information", "Unexpected sysctl output"))?;
        return Ok((Local::now().timestamp() - boot).max(0) as u64);
    }

    let raw = read_system_file("/proc/uptime", "uptime").await?;
    parse_uptime(&raw).ok_or_else(|| ToolError::failed("Failed to get uptime information", "Unexpected /proc/uptime format"))
}

async fn load_average() -> Result<[f64; 3], ToolError> {
    let raw = if cfg!(target_os = "macos") {
        command_output("sysctl", &["-n", "vm.loadavg"]).await?
    } else {
        read_system_file("/proc/loadavg", "load")
            .await?
    };
    parse_loadavg(&raw).ok_or_else(|| ToolError::failed("Failed to get load average", "Unexpected load average format"))
}

async fn sample_cpu_usage() -> Result<f64, ToolError> {
    let parse = |raw: String| {
        parse_cpu_times(&raw).ok_or_else(|| ToolError::failed("Failed to get cpu information", "Unexpected /proc/stat format"))
    };

    let (idle_a, total_a) = parse(read_system_file("/proc/stat", "cpu").await?)?;
    tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
    let (idle_b, total_b) = parse(read_system_file("/proc/stat", "cpu").await?)?;

    Ok(cpu_usage(idle_a, total_a, idle_b, total_b))
}

async fn linux_battery() -> Option<(f64, String)> {
    let mut entries = tokio::fs::read_dir("/sys/class/power_supply").await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let dir = entry.path();
        let kind = tokio::fs::read_to_string(dir.join("type")).await.unwrap_or_default();
        if kind.trim() != "Battery" {
            continue;
        }
        let capacity = tokio::fs::read_to_string(dir.join("capacity")).await.ok()?;
        let status = tokio::fs::read_to_string(dir.join("status")).await.unwrap_or_default();
        return Some((
            capacity.trim().parse().ok()?,
            status.trim().to_lowercase(),
        ));
    }
    None
}

/// Values of `/proc/meminfo`, converted to bytes
pub fn parse_meminfo(raw: &str) -> Option<MemoryStats> {
    let fields: BTreeMap<&str, u64> = raw
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let kb = rest.split_whitespace().next()?.parse::<u64>().ok()?;
            Some((key.trim(), kb * 1024))
        })
        .collect();

    let total = *fields.get("MemTotal")?;
    let available = fields
        .get("MemAvailable")
        .copied()
        .or_else(|| Some(fields.get("MemFree")? + fields.get("Cached").copied().unwrap_or(0)))?;

    Some(MemoryStats {
        total,
        available,
        swap_total: fields.get("SwapTotal").copied().unwrap_or(0),
        swap_free: fields.get("SwapFree").copied().unwrap_or(0),
    })
}

/// `(idle, total)` jiffies from the aggregate line of `/proc/stat`
pub fn parse_cpu_times(raw: &str) -> Option<(u64, u64)> {
    let line = raw.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if values.len() < 4 {
        return None;
    }
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some((idle, values.iter().sum()))
}

/// Busy percentage between two `/proc/stat` samples
pub fn cpu_usage(idle_a: u64, total_a: u64, idle_b: u64, total_b: u64) -> f64 {
    let total = total_b.saturating_sub(total_a);
    if total == 0 {
        return 0.0;
    }
    let idle = idle_b.saturating_sub(idle_a);
    round1((total - idle.min(total)) as f64 * 100.0 / total as f64)
}

pub fn parse_cpuinfo_model(raw: &str) -> Option<String> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| matches!(key.trim(), "model name" | "Hardware" | "Processor"))
        .map(|(_, value)| value.trim().to_string())
}

/// Load averages from `/proc/loadavg` or `sysctl vm.loadavg`
pub fn parse_loadavg(raw: &str) -> Option<[f64; 3]> {
    let values: Vec<f64> = raw
        .split_whitespace()
        .filter_map(|v| v.trim_matches(|c| c == '{' || c == '}').parse().ok())
        .take(3)
        .collect();
    match values.as_slice() {
        [one, five, fifteen] => Some([*one, *five, *fifteen]),
        _ => None,
    }
}

/// Whole seconds from `/proc/uptime`
pub fn parse_uptime(raw: &str) -> Option<u64> {
    let seconds: f64 = raw.split_whitespace().next()?.parse().ok()?;
    Some(seconds as u64)
}

/// Boot epoch from `sysctl kern.boottime`
pub fn parse_boottime(raw: &str) -> Option<i64> {
    let re = Regex::new(r"sec\s*=\s*(\d+)").ok()?;
    re.captures(raw)?.get(1)?.as_str().parse().ok()
}

/// Available bytes from `vm_stat`: free plus inactive pages
pub fn parse_vm_stat(raw: &str) -> Option<u64> {
    let page_size: u64 = Regex::new(r"page size of (\d+) bytes")
        .ok()?
        .captures(raw)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let pages = |label: &str| -> Option<u64> {
        raw.lines()
            .find_map(|line| line.strip_prefix(label))?
            .trim()
            .trim_end_matches('.')
            .parse()
            .ok()
    };
    Some((pages("Pages free:")? + pages("Pages inactive:")?) * page_size)
}

/// Swap total and free bytes from `sysctl vm.swapusage`
pub fn parse_swapusage(raw: &str) -> Option<(u64, u64)> {
    let re = Regex::new(r"total\s*=\s*([\d.]+)([KMG])B?.*?free\s*=\s*([\d.]+)([KMG])").ok()?;
    let caps = re.captures(raw)?;
    let bytes = |value: &str, unit: &str| -> Option<u64> {
        let scale = match unit {
            "K" => 1024.0,
            "M" => 1024.0 * 1024.0,
            _ => 1024.0 * 1024.0 * 1024.0,
        };
        Some((value.parse::<f64>().ok()? * scale) as u64)
    };
    Some((
        bytes(caps.get(1)?.as_str(), caps.get(2)?.as_str())?,
        bytes(caps.get(3)?.as_str(), caps.get(4)?.as_str())?,
    ))
}

/// Charge and state from `pmset -g batt`
pub fn parse_pmset(raw: &str) -> Option<(f64, String)> {
    let re = Regex::new(r"(\d+)%;\s*([a-zA-Z ]+?);").ok()?;
    let caps = re.captures(raw)?;
    Some((caps.get(1)?.as_str().parse().ok()?, caps.get(2)?.as_str().trim().to_lowercase()))
}

pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, secs),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, secs),
        n => format!("{} days, {}:{:02}:{:02}", n, hours, minutes, secs),
    }
}

/// Filesystems from POSIX `df -kP` output
pub fn parse_df(raw: &str) -> Vec<Value> {
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let total = fields[1].parse::<u64>().ok()? * 1024;
            let used = fields[2].parse::<u64>().ok()? * 1024;
            let free = fields[3].parse::<u64>().ok()? * 1024;
            let percent = fields[4].trim_end_matches('%').parse::<f64>().unwrap_or(0.0);
            Some(json!({
                "device": fields[0],
                "mountpoint": fields[5..].join(" "),
                "total": total,
                "used": used,
                "free": free,
                "percent": percent,
                "total_human": format_size(total),
                "free_human": format_size(free),
            }))
        })
        .collect()
}

/// Interfaces from `/proc/net/dev`
pub fn parse_net_dev(raw: &str) -> Vec<Value> {
    raw.lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let values: Vec<u64> = rest.split_whitespace().filter_map(|v| v.parse().ok()).collect();
            if values.len() < 10 {
                return None;
            }
            Some(json!({
                "name": name.trim(),
                "bytes_recv": values[0],
                "packets_recv": values[1],
                "errors_in": values[2],
                "bytes_sent": values[8],
                "packets_sent": values[9],
            }))
        })
        .collect()
}

/// Rows of `ps -axo pid=,pcpu=,pmem=,comm=`
pub fn parse_ps(raw: &str) -> Vec<ProcessRow> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse().ok()?;
            let cpu_percent = parts.next()?.parse().ok()?;
            let memory_percent = parts.next()?.parse().ok()?;
            let command = parts.collect::<Vec<_>>().join(" ");
            if command.is_empty() {
                return None;
            }
            let name = command.rsplit('/').next().unwrap_or(&command).to_string();
            Some(ProcessRow {
                pid,
                cpu_percent,
                memory_percent,
                name,
            })
        })
        .collect()
}

fn sort_processes(rows: &mut [ProcessRow], sort_by: &str) {
    match sort_by {
        "memory" | "memory_percent" | "mem" => {
            rows.sort_by(|a, b| b.memory_percent.total_cmp(&a.memory_percent))
        }
        "name" => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        "pid" => rows.sort_by_key(|r| r.pid),
        _ => rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent)),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16384000 kB\nMemFree:         1024000 kB\nMemAvailable:    8192000 kB\nCached:          2048000 kB\nSwapTotal:       2097152 kB\nSwapFree:        1048576 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let stats = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(stats.total, 16_384_000 * 1024);
        assert_eq!(stats.available, 8_192_000 * 1024);
        assert_eq!(stats.percent(), 50.0);
        assert_eq!(stats.swap_total - stats.swap_free, 1_048_576 * 1024);

        let legacy = "MemTotal: 1000 kB\nMemFree: 200 kB\nCached: 300 kB\n";
        assert_eq!(parse_meminfo(legacy).unwrap().available, 500 * 1024);
        assert!(parse_meminfo("garbage").is_none());
    }

    #[test]
    fn test_parse_vm_stat_and_swap() {
        let vm_stat = "Mach Virtual Memory Statistics: (page size of 16384 bytes)\n\
                       Pages free:                               10000.\n\
                       Pages active:                             50000.\n\
                       Pages inactive:                           30000.\n\
                       Pages speculative:                         2000.\n";
        assert_eq!(parse_vm_stat(vm_stat), Some(40_000 * 16_384));
        assert_eq!(parse_vm_stat("Pages free: 10."), None);

        let swap = "total = 2048.00M  used = 512.00M  free = 1536.00M  (encrypted)";
        assert_eq!(parse_swapusage(swap), Some((2048 * 1024 * 1024, 1536 * 1024 * 1024)));
        assert_eq!(parse_swapusage("nothing here"), None);
    }

    #[test]
    fn test_cpu_times_and_usage() {
        let raw = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\n";
        assert_eq!(parse_cpu_times(raw), Some((800, 1000)));
        assert_eq!(cpu_usage(800, 1000, 850, 1100), 50.0);
        assert_eq!(cpu_usage(800, 1000, 800, 1000), 0.0);
    }

    #[test]
    fn test_parse_cpuinfo_model() {
        let raw = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Core(TM) i7\n";
        assert_eq!(parse_cpuinfo_model(raw).as_deref(), Some("Intel(R) Core(TM) i7"));
    }

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(parse_loadavg("0.52 0.58 0.59 1/467 12345\n"), Some([0.52, 0.58, 0.59]));
        assert_eq!(parse_loadavg("{ 1.50 1.25 1.00 }"), Some([1.5, 1.25, 1.0]));
        assert_eq!(parse_loadavg("1.0"), None);
    }

    #[test]
    fn test_uptime_parsing_and_format() {
        assert_eq!(parse_uptime("93784.55 180000.00\n"), Some(93784));
        assert_eq!(format_uptime(93784), "1 day, 2:03:04");
        assert_eq!(format_uptime(59), "0:00:59");
        assert_eq!(format_uptime(3 * 86_400), "3 days, 0:00:00");
        assert_eq!(
            parse_boottime("{ sec = 1700000000, usec = 123 } Tue Nov 14"),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_parse_pmset() {
        let raw = "Now drawing from 'AC Power'\n -InternalBattery-0 (id=123)\t87%; charging; 1:02 remaining present: true\n";
        assert_eq!(parse_pmset(raw), Some((87.0, "charging".to_string())));
        assert_eq!(parse_pmset("Now drawing from 'AC Power'"), None);
    }

    #[test]
    fn test_parse_df() {
        let raw = "Filesystem     1024-blocks      Used Available Capacity Mounted on\n/dev/sda1         1000000    250000    750000      25% /\n/dev/sdb1            2048      1024      1024      50% /mnt/My Disk\n";
        let disks = parse_df(raw);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0]["mountpoint"], json!("/"));
        assert_eq!(disks[0]["total"], json!(1_024_000_000u64));
        assert_eq!(disks[1]["mountpoint"], json!("/mnt/My Disk"));
        assert_eq!(disks[1]["percent"], json!(50.0));
    }

    #[test]
    fn test_parse_net_dev() {
        let raw = "Inter-|   Receive                                                |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    lo: 1000 10 0 0 0 0 0 0 1000 10 0 0 0 0 0 0\n  eth0: 5000 50 1 0 0 0 0 0 7000 70 0 0 0 0 0 0\n";
        let interfaces = parse_net_dev(raw);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[1]["name"], json!("eth0"));
        assert_eq!(interfaces[1]["bytes_recv"], json!(5000));
        assert_eq!(interfaces[1]["bytes_sent"], json!(7000));
    }

    #[test]
    fn test_parse_and_sort_ps() {
        let raw = "    1  0.0  0.1 /sbin/init\n  200 12.5  3.0 firefox\n  300  1.0  9.5 Web Content\n  bad line\n";
        let mut rows = parse_ps(raw);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "init");
        assert_eq!(rows[2].name, "Web Content");

        sort_processes(&mut rows, "cpu");
        assert_eq!(rows[0].pid, 200);
        sort_processes(&mut rows, "memory");
        assert_eq!(rows[0].pid, 300);
        sort_processes(&mut rows, "name");
        assert_eq!(rows[0].name, "Web Content");
    }

    #[test]
    fn test_metadata() {
        let tool = SystemInfoTool::new();
        assert_eq!(tool.metadata().name, "system_info_tool");
        assert_eq!(tool.metadata().permissions, vec!["system_info".to_string()]);
        assert_eq!(SystemInfoAction::parse("CPU"), Some(SystemInfoAction::Cpu));
        assert_eq!(SystemInfoAction::ALL.len(), 10);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_memory_on_linux() {
        let output = SystemInfoTool::new()
            .run(SystemInfoAction::Memory, &Params::new())
            .await
            .unwrap();
        assert!(output.data["total"].as_u64().unwrap() > 0);
    }
}
