//! Event dispatch and the per-session parser loop.
//!
//! Each event type code maps to a plain decode function. The parser reads
//! the event header, opens a read-limit window over the event body, calls the
//! registered function and hands the result to the caller or listener.

use crate::checksum::{Checksum, ChecksumKind, NoChecksum, ValidationMode};
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::event::{BinlogEvent, EventHeader, EventType, IntvarEvent};
use crate::rows::{decode_delete_rows, decode_update_rows, decode_write_rows};
use crate::stream::{DecodeStream, Endian};
use crate::traits::{EventListener, RowCodec, RowFilter, TableMetadata, TableRegistry};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, trace};

/// Collaborators and settings available to a decode function.
pub struct DecodeContext<'a, R: Read> {
    pub checksum: &'a mut dyn Checksum,
    pub registry: &'a dyn TableRegistry,
    pub filter: Option<&'a dyn RowFilter>,
    pub codec: &'a dyn RowCodec<R>,
    pub checksum_kind: ChecksumKind,
    pub validation: ValidationMode,
}

impl<R: Read> DecodeContext<'_, R> {
    /// Reads the event trailer (if the session has one) and validates the
    /// accumulated checksum against it, then resets the accumulator.
    pub fn verify_trailer(&mut self, stream: &mut DecodeStream<R>) -> Result<()> {
        if self.checksum_kind.trailer_len() == 0 {
            self.checksum.reset();
            return Ok(());
        }
        let expected = stream.read_uint(4, Endian::Little, &mut NoChecksum)?;
        self.checksum.validate_and_reset(expected, self.validation)
    }
}

/// Decodes one event body. `Ok(None)` means the event was consumed but
/// intentionally not emitted.
pub type DecodeFn<R> = fn(
    &mut DecodeStream<R>,
    &EventHeader,
    &mut DecodeContext<'_, R>,
) -> Result<Option<BinlogEvent>>;

/// Map from event type code to decode function.
pub struct EventDecoders<R: Read> {
    decoders: HashMap<u8, DecodeFn<R>>,
}

impl<R: Read> EventDecoders<R> {
    /// An empty map; every event is skipped.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Row events (v1 and v2) and intvar events.
    pub fn with_defaults() -> Self {
        let mut decoders = Self::empty();
        decoders.register(EventType::WriteRowsV1, decode_write_rows::<R>);
        decoders.register(EventType::UpdateRowsV1, decode_update_rows::<R>);
        decoders.register(EventType::DeleteRowsV1, decode_delete_rows::<R>);
        decoders.register(EventType::WriteRowsV2, decode_write_rows::<R>);
        decoders.register(EventType::UpdateRowsV2, decode_update_rows::<R>);
        decoders.register(EventType::DeleteRowsV2, decode_delete_rows::<R>);
        decoders.register(EventType::Intvar, decode_intvar::<R>);
        decoders
    }

    /// Adds or replaces the decoder for an event type.
    pub fn register(&mut self, event_type: EventType, decode: DecodeFn<R>) -> &mut Self {
        self.decoders.insert(event_type.code(), decode);
        self
    }

    pub fn remove(&mut self, event_type: EventType) -> Option<DecodeFn<R>> {
        self.decoders.remove(&event_type.code())
    }

    pub fn get(&self, code: u8) -> Option<DecodeFn<R>> {
        self.decoders.get(&code).copied()
    }

    pub fn contains(&self, event_type: EventType) -> bool {
        self.decoders.contains_key(&event_type.code())
    }
}

impl<R: Read> Default for EventDecoders<R> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Decodes an `INTVAR` event: a 1-byte variable kind and an 8-byte value.
pub fn decode_intvar<R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    ctx: &mut DecodeContext<'_, R>,
) -> Result<Option<BinlogEvent>> {
    let kind = stream.read_u8(&mut *ctx.checksum)?;
    let value = stream.read_uint64(8, Endian::Little, &mut *ctx.checksum)?;
    ctx.verify_trailer(stream)?;
    Ok(Some(BinlogEvent::Intvar(IntvarEvent {
        header: *header,
        kind,
        value,
    })))
}

/// A replication session over one byte source.
///
/// The parser owns the decode stream, the running checksum and the dispatch
/// map; the table registry and row codec are supplied by the caller.
///
/// ```rust,no_run
/// # use binlogstream::*;
/// # use std::collections::HashMap;
/// # fn run<C: RowCodec<std::fs::File>>(codec: C) -> Result<()> {
/// let source = std::fs::File::open("events.bin")?;
/// let registry: HashMap<u64, TableMetadata> = HashMap::new();
/// let mut parser = BinlogParser::new(source, registry, codec);
/// parser.process_all(&mut |event: BinlogEvent| {
///     println!("{:?}", event.header());
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct BinlogParser<R: Read, K: RowCodec<R>, T: TableRegistry = HashMap<u64, TableMetadata>> {
    stream: DecodeStream<R>,
    checksum: Box<dyn Checksum + Send>,
    decoders: EventDecoders<R>,
    registry: T,
    codec: K,
    filter: Option<Box<dyn RowFilter>>,
    config: DecoderConfig,
}

impl<R: Read, K: RowCodec<R>, T: TableRegistry> BinlogParser<R, K, T> {
    /// Creates a parser with the default configuration.
    pub fn new(source: R, registry: T, codec: K) -> Self {
        Self::with_config(source, registry, codec, DecoderConfig::default())
    }

    pub fn with_config(source: R, registry: T, codec: K, config: DecoderConfig) -> Self {
        Self {
            stream: DecodeStream::with_capacity(source, config.buffer_size),
            checksum: config.checksum.accumulator(),
            decoders: EventDecoders::with_defaults(),
            registry,
            codec,
            filter: None,
            config,
        }
    }

    /// Installs a row filter consulted before each row event body is decoded.
    pub fn with_filter(mut self, filter: impl RowFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_decoders(mut self, decoders: EventDecoders<R>) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn decoders_mut(&mut self) -> &mut EventDecoders<R> {
        &mut self.decoders
    }

    pub fn registry(&self) -> &T {
        &self.registry
    }

    /// Mutable access for callers that maintain table metadata between events.
    pub fn registry_mut(&mut self) -> &mut T {
        &mut self.registry
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Switches the checksum algorithm, e.g. after reading a format
    /// description event. Takes effect from the next event.
    pub fn set_checksum_kind(&mut self, kind: ChecksumKind) {
        self.config.checksum = kind;
        self.checksum = kind.accumulator();
    }

    pub fn set_validation_mode(&mut self, mode: ValidationMode) {
        self.config.validation = mode;
    }

    pub fn stream(&self) -> &DecodeStream<R> {
        &self.stream
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }

    /// Decodes the next emitted event.
    ///
    /// Filtered, empty and unregistered events are consumed and skipped.
    /// Returns `Ok(None)` when the source ends cleanly on an event boundary.
    pub fn next_event(&mut self) -> Result<Option<BinlogEvent>> {
        loop {
            self.stream.set_limit(0);
            if self.stream.is_exhausted()? {
                return Ok(None);
            }

            self.checksum.reset();
            let header = EventHeader::read(&mut self.stream, &mut self.checksum)?;
            let body_len = header.body_len()?;
            if body_len < self.config.checksum.trailer_len() {
                // Step over the stray body so the next call starts on a header.
                self.stream.skip(body_len, &mut NoChecksum)?;
                return Err(Error::invalid_event(format!(
                    "event body of {body_len} bytes cannot hold the checksum trailer"
                )));
            }
            if body_len == 0 {
                trace!(event_type = header.event_type, "empty event body");
                continue;
            }

            self.stream.set_limit(body_len);
            trace!(
                event_type = header.event_type,
                body_len,
                next_position = header.next_position,
                "opened event window"
            );

            let outcome = match self.decoders.get(header.event_type) {
                Some(decode) => {
                    let mut ctx = DecodeContext {
                        checksum: &mut *self.checksum,
                        registry: &self.registry,
                        filter: self.filter.as_deref(),
                        codec: &self.codec,
                        checksum_kind: self.config.checksum,
                        validation: self.config.validation,
                    };
                    decode(&mut self.stream, &header, &mut ctx)
                }
                None => {
                    debug!(
                        event_type = header.event_type,
                        body_len, "skipping event without a registered decoder"
                    );
                    let skipped = self.stream.skip(body_len, &mut self.checksum);
                    self.checksum.reset();
                    skipped.map(|()| None)
                }
            };

            // Realign on the next event even when decoding failed.
            let realigned = self.discard_leftover(header.event_type);
            self.stream.set_limit(0);
            let decoded = outcome?;
            realigned?;

            if let Some(event) = decoded {
                return Ok(Some(event));
            }
        }
    }

    /// Drops whatever the decoder left unread in the event window.
    fn discard_leftover(&mut self, event_type: u8) -> Result<()> {
        let leftover = self.stream.available_in_window();
        if leftover == 0 {
            return Ok(());
        }
        trace!(event_type, leftover, "discarding unread event bytes");
        self.checksum.reset();
        self.stream.skip(leftover, &mut NoChecksum)
    }

    /// Decodes every remaining event, handing each to `listener`.
    pub fn process_all<L>(&mut self, listener: &mut L) -> Result<()>
    where
        L: EventListener + ?Sized,
    {
        while let Some(event) = self.next_event()? {
            listener.on_event(event);
        }
        Ok(())
    }

    /// Returns an iterator-like handle for manual event processing.
    pub fn events(&mut self) -> Events<'_, R, K, T> {
        Events { parser: self }
    }
}

/// Manual event iteration over a `BinlogParser`.
pub struct Events<'a, R: Read, K: RowCodec<R>, T: TableRegistry> {
    parser: &'a mut BinlogParser<R, K, T>,
}

impl<R: Read, K: RowCodec<R>, T: TableRegistry> Events<'_, R, K, T> {
    /// Returns the next event, `Ok(None)` at a clean end of stream.
    pub fn next(&mut self) -> Result<Option<BinlogEvent>> {
        self.parser.next_event()
    }
}
