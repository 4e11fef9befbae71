use serde::Serialize;

/// Structured trace events emitted across the tunnelgate crates.
///
/// Each event is rendered as a single JSON field so log pipelines can pick
/// session lifecycle records out of the general `tracing` stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        session_id: String,
        status: String,
        is_new: bool,
    },
    SessionActivated {
        session_id: String,
        status: String,
    },
    ConnectionAuthorized {
        session_id: String,
        connection_id: String,
        connections_left: i32,
    },
    SessionEvicted {
        session_id: String,
        reason: String,
        connections: usize,
    },
    ControllerSwapped {
        generation: u64,
    },
    ControllerLost {
        generation: u64,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tg_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::ConnectionAuthorized {
            session_id: "s_1".into(),
            connection_id: "c_1".into(),
            connections_left: 3,
        };
        let v: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "ConnectionAuthorized");
        assert_eq!(v["connection_id"], "c_1");
        assert_eq!(v["connections_left"], 3);
    }
}
