pub mod completeness;
pub mod documents;
pub mod locks;
pub mod notification;
pub mod onboarding;
pub mod storage;
pub mod store;
pub mod supabase_store;
pub mod transition;

pub use completeness::{CompletenessReport, ProfileCompletenessEvaluator};
pub use notification::{LifecycleEvent, LifecycleEventKind, NotificationEmitter, TracingNotifier};
pub use onboarding::OnboardingService;
pub use storage::{DocumentStorage, InMemoryDocumentStorage, SupabaseDocumentStorage};
pub use store::{InMemorySpecialistStore, SpecialistStore};
pub use supabase_store::SupabaseSpecialistStore;
pub use transition::{Transition, TransitionGuard};
