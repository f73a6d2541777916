// ============================================================
// metrics: Prometheus counters exposed on /metrics
// ============================================================

use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry:              Registry,
    pub payment_intents:   IntCounter,
    pub setup_intents:     IntCounter,
    pub refunds:           IntCounter,
    pub customers_created: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;
        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        Ok(Metrics {
            payment_intents: counter(
                "payment_gateway_payment_intents_total",
                "Payment intents created",
            )?,
            setup_intents: counter(
                "payment_gateway_setup_intents_total",
                "Setup intents created",
            )?,
            refunds: counter("payment_gateway_refunds_total", "Refunds issued")?,
            customers_created: counter(
                "payment_gateway_customers_created_total",
                "Customers created while resolving a request",
            )?,
            registry,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
