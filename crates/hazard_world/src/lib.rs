pub mod config;
pub mod display;
pub mod effects;
pub mod engine;
pub mod error;
pub mod event;
pub mod geometry;
pub mod indicator;
pub mod item;
pub mod ledger;
pub mod messages;
pub mod store;
pub mod types;
pub mod zone;
pub mod zone_map;

pub use hazard_world_proto::{
    decode_effects, encode_effects, CodecError, MitigationEffect, LEDGER_PROTOCOL_VERSION,
};

pub use config::{
    EngineConfig, HazardConfig, ZoneDescriptor, DEFAULT_CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML,
};
pub use error::{CapabilityUnavailable, ConfigError, EngineError, StorageError};
pub use geometry::{Cuboid, VerticalBounds, WorldPos};
pub use types::{
    immunity_permission, normalize_zone_id, EffectId, EntityId, WorldId, ZoneId, DEFAULT_ZONE_ID,
};

// Ledger
pub use ledger::{
    DecayOutcome, LedgerKeys, LedgerMigration, LedgerRecord, LedgerSchema,
    LegacySingleEffectMigration, MigrationChain, MitigationLedger, LEGACY_EFFECT_ID,
};
pub use store::{AttachmentStore, AttachmentValue, InMemoryAttachmentStore};

// Zones and the hazard decision
pub use event::{
    ledger_consult_listener, EvaluationContext, HazardEvaluationEvent, HazardListener,
    HazardListenerRegistry, HazardOutcome, ListenerPriority,
};
pub use zone::{
    CapabilityPolicy, EntityDirectory, EntityLocation, FlagMatcher, PermissionCheck,
    SpatialZoneQuery, ZoneMatcher, ZoneQueryResult,
};
pub use zone_map::{InMemoryEntityDirectory, InMemoryPermissions, InMemoryZoneMap, ZoneRegion};

// Presentation
pub use display::{DesiredIndicator, DisplayDelta, DisplayReconciler, DisplayState, IndicatorKey};
pub use effects::{RecordingEffectApplier, StatusEffect, StatusEffectApplier};
pub use indicator::{
    InMemoryIndicatorService, IndicatorColor, IndicatorFlag, IndicatorHandle, IndicatorRecord,
    IndicatorService, IndicatorStyle, IndicatorTemplate, IndicatorTemplates,
};
pub use item::{format_duration, MitigationItem, Rgb};
pub use messages::{colorize, format_template, MessageSink, RecordingMessageSink, SentMessage};

// Engine
pub use engine::{
    AdvanceReport, ClearReason, DecayReport, EvaluationReport, ExpiredEffect, ExposureCapabilities,
    ExposureEngine, ExposureSnapshot, HazardZone, SkippedEntity, TickKind, TickSchedule,
    ZoneSnapshot, ZoneState, ZoneTransition, LEDGER_CONSULT_LISTENER,
};
