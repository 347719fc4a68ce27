#![allow(dead_code)]

use async_trait::async_trait;
use perfsuite_core::model::{ExecutionConfig, ThresholdSpec};
use perfsuite_platform::command::{CommandOutput, ToolCommand};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned output for commands containing a pattern. The last queued
/// reply for a pattern repeats once the queue drains.
#[derive(Default)]
pub struct ScriptedTool {
    rules: Mutex<Vec<(String, VecDeque<CommandOutput>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, stdout: &str) -> Self {
        self.reply(
            pattern,
            CommandOutput {
                status: Some(0),
                stdout: stdout.into(),
                stderr: String::new(),
            },
        )
    }

    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.reply(
            pattern,
            CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: stderr.into(),
            },
        )
    }

    fn reply(self, pattern: &str, out: CommandOutput) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|(p, _)| p == pattern) {
                Some((_, queue)) => queue.push_back(out),
                None => rules.push((pattern.to_string(), VecDeque::from([out]))),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }
}

#[async_trait]
impl ToolCommand for ScriptedTool {
    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<CommandOutput> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        for (pattern, queue) in rules.iter_mut() {
            if line.contains(pattern.as_str()) {
                let out = if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap()
                };
                return Ok(out);
            }
        }
        Ok(CommandOutput {
            status: Some(0),
            ..Default::default()
        })
    }
}

pub fn config(platform: &str, serial: Option<&str>) -> ExecutionConfig {
    ExecutionConfig {
        execution_type_name: "cold_start".into(),
        metric_name: "launch_time".into(),
        metric_params: Default::default(),
        execution_type_params: Default::default(),
        test_thresholds: vec![],
        device_name: "Pixel 6".into(),
        device_serial_number: serial.map(str::to_string),
        platform: platform.into(),
        app_name: "appA".into(),
        app_version: "1.0".into(),
        app_package: "com.example.a".into(),
        main_activity: ".MainActivity".into(),
    }
}

pub fn max(output: &str, target: f64) -> ThresholdSpec {
    ThresholdSpec {
        target_value: target,
        threshold_type: "MAX".into(),
        output_name: output.into(),
    }
}

pub fn total_time(ms: u64) -> String {
    format!("Status: ok\nLaunchState: COLD\nTotalTime: {ms}\nWaitTime: {}\nComplete\n", ms + 10)
}
