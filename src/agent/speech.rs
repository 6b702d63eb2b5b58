// Turns an agent turn response into the sentence that gets spoken back to
// the user. Direct port of the Python `speech.py` reference, including its
// exact phrase templates and punctuation conventions.

use serde_json::{Map, Value};

use crate::agent::client::{AgentAction, AgentResult, AgentTurnResponse};
use crate::agent::devices::DeviceCatalog;

pub fn compose_speech(agent_out: &AgentTurnResponse, catalog: &DeviceCatalog) -> String {
    let kind = agent_out.kind.trim();
    let message = clean_text(agent_out.message.as_deref().unwrap_or(""));
    let actions = agent_out.actions.as_deref().unwrap_or(&[]);

    if kind == "executed" && !actions.is_empty() {
        let summary = summarize_actions(actions, catalog);
        let (ok, total, failures) = summarize_results(agent_out.result.as_ref(), actions.len());

        let prefix = if total > 0 && ok == total {
            "已提交执行：".to_string()
        } else if total > 0 {
            format!("部分失败（成功 {}，失败 {}）：", ok, total - ok)
        } else {
            "已提交执行：".to_string()
        };

        let mut parts = vec![format!("{}{}", prefix, summary)];
        if !failures.is_empty() {
            parts.push(failures.join("；"));
        }
        if !message.is_empty() && !parts[0].contains(&message) {
            parts.push(message);
        }

        return parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.trim_end_matches('。').to_string())
            .collect::<Vec<_>>()
            .join("。");
    }

    if kind == "propose" && !actions.is_empty() {
        let summary = summarize_actions(actions, catalog);
        if message.is_empty() {
            return format!("我准备执行：{}。请说确认或取消。", summary);
        }
        if !summary.is_empty() && !message.contains(&summary) {
            return format!("{}。我准备执行：{}。请说确认或取消。", message, summary);
        }
        return message;
    }

    if message.is_empty() {
        "好的。".to_string()
    } else {
        message
    }
}

pub fn summarize_actions(actions: &[AgentAction], catalog: &DeviceCatalog) -> String {
    let empty_params = Map::new();
    let parts: Vec<String> = actions
        .iter()
        .filter_map(|a| {
            let device_id = a.resolved_device_id();
            let action = a.action.clone().unwrap_or_default();
            if device_id.is_empty() || action.is_empty() {
                return None;
            }
            let params = a.params.as_ref().unwrap_or(&empty_params);
            let name = catalog.name_for(&device_id);
            let phrase = action_to_phrase(&action, &name, params);
            if phrase.is_empty() {
                None
            } else {
                Some(phrase)
            }
        })
        .collect();

    if parts.is_empty() {
        "执行设备操作".to_string()
    } else {
        parts.join("，")
    }
}

pub fn summarize_results(result: Option<&AgentResult>, actions_len: usize) -> (usize, usize, Vec<String>) {
    let items = match result.and_then(|r| r.results.as_ref()) {
        Some(items) => items,
        None => return (0, actions_len, Vec::new()),
    };

    let mut ok = 0;
    let mut failures = Vec::new();
    for r in items {
        if r.ok == Some(true) {
            ok += 1;
            continue;
        }
        let device_id = r.device_id.clone().unwrap_or_default();
        let action = r.action.clone().unwrap_or_default();
        let mut err = String::new();
        if let Some(Value::Object(inner)) = &r.result {
            err = inner
                .get("error")
                .or_else(|| inner.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string();
        }
        if err.is_empty() {
            err = r
                .error
                .clone()
                .or_else(|| r.message.clone())
                .unwrap_or_default()
                .trim()
                .to_string();
        }

        let detail = if !device_id.is_empty() || !action.is_empty() || !err.is_empty() {
            format!("（{} {} {}）", device_id, action, err)
        } else {
            String::new()
        };
        failures.push(format!("失败{}", detail));
    }
    (ok, items.len(), failures)
}

pub fn action_to_phrase(action: &str, device_name: &str, params: &Map<String, Value>) -> String {
    match action {
        "turn_on" => format!("打开{}", device_name),
        "turn_off" => format!("关闭{}", device_name),
        "toggle" => format!("切换{}", device_name),
        "set_brightness" => match number_param(params, "brightness") {
            Some(v) => format!("把{}亮度调到{}%", device_name, v as i64),
            None => format!("调整{}亮度", device_name),
        },
        "set_cover_position" => match number_param(params, "position") {
            Some(v) => format!("把{}窗帘调到{}%", device_name, v as i64),
            None => format!("调整{}窗帘位置", device_name),
        },
        "set_temperature" => match number_param(params, "temperature") {
            Some(v) => format!("把{}温度设为{}度", device_name, v as i64),
            None => format!("调整{}温度", device_name),
        },
        "set_hvac_mode" => match params.get("mode").and_then(Value::as_str) {
            Some(mode) if !mode.is_empty() => format!("把{}模式设为{}", device_name, mode),
            _ => format!("调整{}模式", device_name),
        },
        other => format!("对{}执行{}", device_name, other),
    }
}

fn number_param(params: &Map<String, Value>, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

pub fn clean_text(text: &str) -> String {
    let mut t = text.trim().replace('\n', " ").replace('\r', " ");
    while t.contains("  ") {
        t = t.replace("  ", " ");
    }
    t.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_action_to_phrase_turn_on() {
        assert_eq!(action_to_phrase("turn_on", "客厅灯", &Map::new()), "打开客厅灯");
    }

    #[test]
    fn test_action_to_phrase_set_brightness_with_value() {
        let p = params(&[("brightness", Value::from(60))]);
        assert_eq!(action_to_phrase("set_brightness", "台灯", &p), "把台灯亮度调到60%");
    }

    #[test]
    fn test_action_to_phrase_set_brightness_missing_value() {
        assert_eq!(action_to_phrase("set_brightness", "台灯", &Map::new()), "调整台灯亮度");
    }

    #[test]
    fn test_action_to_phrase_unknown_action_falls_back() {
        assert_eq!(action_to_phrase("lock", "门锁", &Map::new()), "对门锁执行lock");
    }

    #[test]
    fn test_clean_text_collapses_whitespace_and_newlines() {
        assert_eq!(clean_text("hello\n\n  world  "), "hello world");
    }

    #[test]
    fn test_summarize_results_all_ok() {
        let result = AgentResult {
            results: Some(vec![
                crate::agent::client::AgentActionResult {
                    ok: Some(true),
                    device_id: Some("d1".to_string()),
                    action: Some("turn_on".to_string()),
                    result: None,
                    error: None,
                    message: None,
                },
            ]),
        };
        let (ok, total, failures) = summarize_results(Some(&result), 1);
        assert_eq!((ok, total), (1, 1));
        assert!(failures.is_empty());
    }

    #[test]
    fn test_summarize_results_with_failure_detail() {
        let result = AgentResult {
            results: Some(vec![crate::agent::client::AgentActionResult {
                ok: Some(false),
                device_id: Some("d1".to_string()),
                action: Some("turn_on".to_string()),
                result: None,
                error: Some("offline".to_string()),
                message: None,
            }]),
        };
        let (ok, total, failures) = summarize_results(Some(&result), 1);
        assert_eq!((ok, total), (0, 1));
        assert_eq!(failures, vec!["失败（d1 turn_on offline）".to_string()]);
    }
}
