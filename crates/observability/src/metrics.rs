//! 事件摄入指标模块
//!
//! 记录 CLI 摄入路径的指标，并在内存中聚合运行统计。

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// 记录一次成功摄入的事件
pub fn record_event_ingested(service_id: &str) {
    counter!(
        "monza_events_ingested_total",
        "service_id" => service_id.to_string()
    )
    .increment(1);
}

/// 记录一行无法解码的输入
pub fn record_ingest_error() {
    counter!("monza_ingest_errors_total").increment(1);
}

/// 记录入队等待时间 (队列满时 record 会等待)
pub fn record_enqueue_wait_ms(wait_ms: f64) {
    histogram!("monza_enqueue_wait_ms").record(wait_ms);
}

/// 记录当前活跃 destination 数量
pub fn record_active_destinations(count: usize) {
    gauge!("monza_cli_destinations_active").set(count as f64);
}

/// 摄入指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct IngestStatsAggregator {
    /// 读取的输入行数
    pub total_lines: u64,

    /// 成功解码并记录的事件数
    pub total_events: u64,

    /// 解码失败的行数
    pub decode_errors: u64,

    /// 入队等待统计 (毫秒)
    pub enqueue_wait_stats: RunningStats,

    /// 各 service_id 的事件数
    pub service_counts: HashMap<String, u64>,
}

impl IngestStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 统计一个已记录的事件
    pub fn update(&mut self, service_id: &str, enqueue_wait_ms: f64) {
        self.total_lines += 1;
        self.total_events += 1;
        self.enqueue_wait_stats.push(enqueue_wait_ms);
        *self
            .service_counts
            .entry(service_id.to_string())
            .or_insert(0) += 1;
    }

    /// 统计一行解码失败的输入
    pub fn record_error(&mut self) {
        self.total_lines += 1;
        self.decode_errors += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            total_lines: self.total_lines,
            total_events: self.total_events,
            decode_errors: self.decode_errors,
            error_rate: if self.total_lines > 0 {
                self.decode_errors as f64 / self.total_lines as f64 * 100.0
            } else {
                0.0
            },
            enqueue_wait_ms: StatsSummary::from(&self.enqueue_wait_stats),
            service_counts: self.service_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 摄入摘要
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub total_lines: u64,
    pub total_events: u64,
    pub decode_errors: u64,
    pub error_rate: f64,
    pub enqueue_wait_ms: StatsSummary,
    pub service_counts: HashMap<String, u64>,
}

impl std::fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Ingest Summary ===")?;
        writeln!(f, "Input lines: {}", self.total_lines)?;
        writeln!(f, "Events recorded: {}", self.total_events)?;
        writeln!(
            f,
            "Decode errors: {} ({:.2}%)",
            self.decode_errors, self.error_rate
        )?;
        writeln!(f, "Enqueue wait (ms): {}", self.enqueue_wait_ms)?;

        if !self.service_counts.is_empty() {
            let mut services: Vec<_> = self.service_counts.iter().collect();
            services.sort();
            writeln!(f, "Events per service:")?;
            for (service, count) in services {
                writeln!(f, "  {}: {}", service, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 9.0).abs() < 1e-10);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_stats_display() {
        let summary = StatsSummary::from(&RunningStats::default());
        assert_eq!(summary.to_string(), "N/A");
    }

    #[test]
    fn test_aggregator_counts_events_and_errors() {
        let mut aggregator = IngestStatsAggregator::new();
        aggregator.update("auth", 0.5);
        aggregator.update("auth", 1.5);
        aggregator.update("billing", 0.0);
        aggregator.record_error();

        let summary = aggregator.summary();
        assert_eq!(summary.total_lines, 4);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.decode_errors, 1);
        assert!((summary.error_rate - 25.0).abs() < 1e-10);
        assert_eq!(summary.service_counts.get("auth"), Some(&2));
        assert_eq!(summary.enqueue_wait_ms.count, 3);

        aggregator.reset();
        assert_eq!(aggregator.total_lines, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = IngestStatsAggregator::new();
        aggregator.update("billing", 2.0);
        aggregator.update("auth", 1.0);

        let output = aggregator.summary().to_string();
        assert!(output.contains("Events recorded: 2"));
        assert!(output.contains("0.00%"));
        // Services are listed in name order
        let auth = output.find("auth: 1").unwrap();
        let billing = output.find("billing: 1").unwrap();
        assert!(auth < billing);
    }
}
