use std::fmt::Write;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: String,
    pub elapsed: Duration,
}

/// 分段計時器，記錄每個命名階段的耗時
#[derive(Debug)]
pub struct StopWatch {
    id: String,
    tasks: Vec<TaskInfo>,
    current: Option<(String, Instant)>,
}

impl StopWatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: Vec::new(),
            current: None,
        }
    }

    /// 開始新階段；若上一階段未結束則先結束它
    pub fn start(&mut self, name: impl Into<String>) {
        self.stop();
        self.current = Some((name.into(), Instant::now()));
    }

    pub fn stop(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.tasks.push(TaskInfo {
                name,
                elapsed: started.elapsed(),
            });
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn tasks(&self) -> &[TaskInfo] {
        &self.tasks
    }

    pub fn total_time(&self) -> Duration {
        self.tasks.iter().map(|t| t.elapsed).sum()
    }

    pub fn total_time_millis(&self) -> u128 {
        self.total_time().as_millis()
    }

    pub fn pretty_print(&self) -> String {
        let total = self.total_time();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "StopWatch '{}': running time = {} ms",
            self.id,
            total.as_millis()
        );
        out.push_str("---------------------------------------------\n");
        out.push_str("ms       %      Task name\n");
        out.push_str("---------------------------------------------\n");
        for task in &self.tasks {
            let percent = if total.is_zero() {
                0.0
            } else {
                task.elapsed.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            let _ = writeln!(
                out,
                "{:<8} {:>5.1}%  {}",
                task.elapsed.as_millis(),
                percent,
                task.name
            );
        }
        out
    }
}
