/// Tag identifying what kind of out-of-band event a [`Warning`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// RX: the producer dropped samples because no free slot was available.
    Overflow,
    /// TX: the consumer ran out of samples to transmit.
    Underflow,
    /// TX: the consumer substituted zeros because the ring was momentarily empty.
    BufferEmpty,
    /// A fatal condition observed by the task (e.g. the external process died).
    Error,
    /// Non-fatal notice (e.g. clean exit without `writer_done`).
    Notice,
}

/// A tagged, timestamped record surfaced on the warnings channel.
///
/// `time_label` is a free-form short string: elapsed-seconds for RX,
/// sample-time for TX. Warnings are dropped silently on a full channel —
/// see [`crate::try_send`].
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub time_label: String,
    pub detail: Option<String>,
}

impl Warning {
    pub fn new(kind: WarningKind, time_label: impl Into<String>) -> Self {
        Self {
            kind,
            time_label: time_label.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Stats emitted after each successfully published TX chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub total_samples: u64,
}

/// Non-blocking publish: dropped silently if the channel is full or the
/// receiving end has gone away. Hot loops must never suspend here.
pub fn try_send<T>(sender: &crossbeam_channel::Sender<T>, value: T) {
    let _ = sender.try_send(value);
}
