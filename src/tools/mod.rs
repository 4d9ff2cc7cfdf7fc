pub mod artifact;
pub mod backend;
pub mod catalog;
pub mod descriptor;
pub mod dot;
pub mod executor;
pub mod html;
pub mod probe;
pub mod registry;
pub mod schema;
pub mod specialist;

pub use artifact::{mime_type, Artifact, ArtifactStore, RenderResult, RenderStatus};
pub use backend::{CommandBackend, RenderBackend, RenderJob, RenderRoutine, SourceTransform};
pub use catalog::{builtin_tools, register_builtin, CatalogEntry, CatalogOptions, BUILTIN_TOOL_NAMES};
pub use descriptor::{
    DomainTag, OutputKind, ParamSchema, ParamSpec, ParamType, ToolDescriptor, ValidatedParams,
};
pub use executor::{AdapterSettings, InvocationAdapter, RenderRequest};
pub use html::{CodeEmbedding, HtmlBackend};
pub use probe::{find_in_paths, find_on_path, CapabilityProbe, DependencyCheckResult, Requirement};
pub use registry::{ActivationReport, ActiveToolSet, RegisteredTool, ToolRegistry, ToolSpec};
pub use schema::tool_call_schema_json;
pub use specialist::Specialist;
