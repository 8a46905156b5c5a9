use std::sync::{Arc, Mutex};

use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};

use tosa_legalize::{
    legalize_activation, ActivationDescriptor, AtomicIdSource, DataType, FunctionKind,
    LegalizeOptions, QuantizationParams, Shape, TensorDescriptor, TABLE_TRACE_TARGET,
};

/// Records `(target, level)` for every event it sees.
#[derive(Clone, Default)]
struct EventLog {
    events: Arc<Mutex<Vec<(String, Level)>>>,
}

impl EventLog {
    fn count(&self, target: &str, level: Level) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, l)| t == target && *l == level)
            .count()
    }
}

impl Subscriber for EventLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _: &Id, _: &Record<'_>) {}

    fn record_follows_from(&self, _: &Id, _: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let meta = event.metadata();
        self.events
            .lock()
            .unwrap()
            .push((meta.target().to_string(), *meta.level()));
    }

    fn enter(&self, _: &Id) {}

    fn exit(&self, _: &Id) {}
}

fn lower(dtype: DataType, kind: FunctionKind) {
    let tensor = match dtype {
        DataType::Float32 => TensorDescriptor::new(dtype, Shape::new(vec![4])),
        _ => TensorDescriptor::quantized(
            dtype,
            Shape::new(vec![4]),
            QuantizationParams::new(0.1, 0),
        ),
    };
    legalize_activation(
        None,
        &ActivationDescriptor::new(kind),
        std::slice::from_ref(&tensor),
        std::slice::from_ref(&tensor),
        &AtomicIdSource::new(),
        &LegalizeOptions::default(),
    )
    .expect("lowering succeeds");
}

#[test]
fn table_synthesis_is_traced_under_dedicated_target() {
    let log = EventLog::default();
    tracing::subscriber::with_default(log.clone(), || {
        lower(DataType::Int8Asymm, FunctionKind::Sigmoid);
    });
    assert_eq!(log.count(TABLE_TRACE_TARGET, Level::TRACE), 1);
    assert_eq!(TABLE_TRACE_TARGET, "tosa_legalize::tables");
}

#[test]
fn native_lowering_emits_no_table_trace() {
    let log = EventLog::default();
    tracing::subscriber::with_default(log.clone(), || {
        lower(DataType::Float32, FunctionKind::Rsqrt);
    });
    assert_eq!(log.count(TABLE_TRACE_TARGET, Level::TRACE), 0);
    assert!(log.count("tosa_legalize::legalize", Level::DEBUG) >= 1);
}
