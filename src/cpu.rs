//! CPU instruction-set ladder and capability-tag dispatch.
//!
//! The ladder resolves the three ingredients of CPU kernel selection:
//! the hardware ceiling probed once per process
//! ([`detect_top_cpu_extension`]), the set of tiers this build compiled in
//! ([`compiled_tiers`], driven by the `cpu-*` cargo features), and the
//! ceiling a policy allows ([`CpuContext::enabled_cpu_extensions`]).
//! [`dispatch_by_cpu`] intersects all three and invokes an operation with
//! the single highest qualifying [capability tag](tags).
//!
//! Falling back to the baseline tier when a higher tier was compiled out is
//! graceful degradation, not an error; [`selected_cpu_tier`] exposes the
//! chosen tier so callers can surface it.

use std::sync::OnceLock;

use crate::context::CpuContext;

/// Hardware ceiling, probed once and cached for the process lifetime.
static TOP_EXTENSION: OnceLock<CpuExtension> = OnceLock::new();

/// One CPU instruction-set level, ordered from baseline upward.
///
/// `Baseline` corresponds to SSE2 on x86_64 and is always compiled in; it is
/// the unconditional fallback tier on every architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CpuExtension {
    /// Baseline tier (SSE2 on x86_64). Always available.
    Baseline,
    /// SSSE3 (128-bit).
    Ssse3,
    /// SSE4.2 (128-bit).
    Sse42,
    /// AVX (256-bit).
    Avx,
    /// AVX2 (256-bit, Haswell 2013+).
    Avx2,
    /// AVX-512F (512-bit, Skylake-X 2017+).
    Avx512,
}

impl CpuExtension {
    /// All tiers above baseline, highest first. Selection order for the
    /// ladder.
    pub const DESCENDING: [Self; 5] =
        [Self::Avx512, Self::Avx2, Self::Avx, Self::Sse42, Self::Ssse3];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of instruction-set tiers. Baseline is always a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionSet(u8);

impl ExtensionSet {
    /// The set containing only the baseline tier.
    #[must_use]
    pub const fn baseline_only() -> Self {
        Self(CpuExtension::Baseline.bit())
    }

    /// Returns this set with `ext` added.
    #[must_use]
    pub const fn with(self, ext: CpuExtension) -> Self {
        Self(self.0 | ext.bit())
    }

    /// Whether `ext` is a member.
    #[must_use]
    pub const fn contains(self, ext: CpuExtension) -> bool {
        self.0 & ext.bit() != 0
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::baseline_only()
    }
}

/// The instruction-set tiers this build compiled kernel variants for.
///
/// Driven by the `cpu-ssse3`, `cpu-sse42`, `cpu-avx`, `cpu-avx2`, and
/// `cpu-avx512` cargo features (all enabled by default). Baseline is always
/// present.
#[must_use]
pub const fn compiled_tiers() -> ExtensionSet {
    let mut set = ExtensionSet::baseline_only();
    if cfg!(feature = "cpu-ssse3") {
        set = set.with(CpuExtension::Ssse3);
    }
    if cfg!(feature = "cpu-sse42") {
        set = set.with(CpuExtension::Sse42);
    }
    if cfg!(feature = "cpu-avx") {
        set = set.with(CpuExtension::Avx);
    }
    if cfg!(feature = "cpu-avx2") {
        set = set.with(CpuExtension::Avx2);
    }
    if cfg!(feature = "cpu-avx512") {
        set = set.with(CpuExtension::Avx512);
    }
    set
}

/// Highest tier not exceeding `ceiling` that is a member of `compiled`.
///
/// Baseline is returned unconditionally when no higher tier qualifies.
pub(crate) fn select_tier(ceiling: CpuExtension, compiled: ExtensionSet) -> CpuExtension {
    for ext in CpuExtension::DESCENDING {
        if ceiling >= ext && compiled.contains(ext) {
            return ext;
        }
    }
    CpuExtension::Baseline
}

/// Raw hardware probe, uncached and unclamped.
fn probe_hardware() -> CpuExtension {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f") {
            return CpuExtension::Avx512;
        }
        if is_x86_feature_detected!("avx2") {
            return CpuExtension::Avx2;
        }
        if is_x86_feature_detected!("avx") {
            return CpuExtension::Avx;
        }
        if is_x86_feature_detected!("sse4.2") {
            return CpuExtension::Sse42;
        }
        if is_x86_feature_detected!("ssse3") {
            return CpuExtension::Ssse3;
        }
    }

    CpuExtension::Baseline
}

/// The highest instruction-set level usable by this process.
///
/// Probed once per process and cached; repeated calls return the same value
/// with no side effects. The result never exceeds the highest tier in
/// [`compiled_tiers`], so a build with higher tiers compiled out reports the
/// best tier it can actually run.
#[must_use]
pub fn detect_top_cpu_extension() -> CpuExtension {
    *TOP_EXTENSION.get_or_init(|| select_tier(probe_hardware(), compiled_tiers()))
}

/// Zero-size capability tags, one per instruction-set tier.
///
/// A tag carries no data; its type identity selects one compiled kernel
/// variant inside a [`CpuOperation`].
pub mod tags {
    use super::CpuExtension;

    mod sealed {
        pub trait Sealed {}
    }

    /// Marker trait tying a tag type to its [`CpuExtension`] level.
    ///
    /// Sealed: the tier set is fixed at compile time.
    pub trait CapabilityTag: sealed::Sealed + Copy + Default + 'static {
        /// The instruction-set level this tag selects.
        const EXTENSION: CpuExtension;
    }

    macro_rules! capability_tag {
        ($(#[$doc:meta])* $name:ident => $ext:ident) => {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl CapabilityTag for $name {
                const EXTENSION: CpuExtension = CpuExtension::$ext;
            }
        };
    }

    capability_tag!(
        /// Baseline tier tag (SSE2 on x86_64).
        Baseline => Baseline
    );
    capability_tag!(
        /// SSSE3 tier tag.
        Ssse3 => Ssse3
    );
    capability_tag!(
        /// SSE4.2 tier tag.
        Sse42 => Sse42
    );
    capability_tag!(
        /// AVX tier tag.
        Avx => Avx
    );
    capability_tag!(
        /// AVX2 tier tag.
        Avx2 => Avx2
    );
    capability_tag!(
        /// AVX-512 tier tag.
        Avx512 => Avx512
    );
}

/// An operation with one implementation per capability tag.
///
/// [`dispatch_by_cpu`] invokes [`run`](CpuOperation::run) exactly once, with
/// the highest qualifying tag. Implementations typically branch on
/// `Tag::EXTENSION` or specialize through inherent generics.
pub trait CpuOperation {
    /// Result type, shared by all tier variants.
    type Output;

    /// Runs the variant selected by `Tag`.
    fn run<Tag: tags::CapabilityTag>(self) -> Self::Output;
}

/// Invokes `op` with the highest capability tag not exceeding both the
/// context's extension ceiling and the build's [`compiled_tiers`].
///
/// This is the only dynamic-dispatch point in the subsystem; every other
/// selection axis resolves at compile time. Exactly one invocation occurs
/// per call, and the baseline tag is used unconditionally when no higher
/// tier qualifies.
pub fn dispatch_by_cpu<Op: CpuOperation>(ctx: &CpuContext, op: Op) -> Op::Output {
    match select_tier(ctx.enabled_cpu_extensions(), compiled_tiers()) {
        CpuExtension::Avx512 => op.run::<tags::Avx512>(),
        CpuExtension::Avx2 => op.run::<tags::Avx2>(),
        CpuExtension::Avx => op.run::<tags::Avx>(),
        CpuExtension::Sse42 => op.run::<tags::Sse42>(),
        CpuExtension::Ssse3 => op.run::<tags::Ssse3>(),
        CpuExtension::Baseline => op.run::<tags::Baseline>(),
    }
}

/// The tier [`dispatch_by_cpu`] would pick for `ctx`.
///
/// Observability hook: lets callers detect that capable hardware degraded to
/// a lower tier because the higher variant was compiled out.
#[must_use]
pub fn selected_cpu_tier(ctx: &CpuContext) -> CpuExtension {
    select_tier(ctx.enabled_cpu_extensions(), compiled_tiers())
}

#[cfg(test)]
mod tests {
    use super::tags::CapabilityTag;
    use super::*;
    use crate::policy::host_policy;

    struct RecordTier;

    impl CpuOperation for RecordTier {
        type Output = CpuExtension;

        fn run<Tag: CapabilityTag>(self) -> CpuExtension {
            Tag::EXTENSION
        }
    }

    struct CountAndRecord<'a> {
        calls: &'a mut u32,
    }

    impl CpuOperation for CountAndRecord<'_> {
        type Output = CpuExtension;

        fn run<Tag: CapabilityTag>(self) -> CpuExtension {
            *self.calls += 1;
            Tag::EXTENSION
        }
    }

    #[test]
    fn test_detection_is_idempotent() {
        let first = detect_top_cpu_extension();
        let second = detect_top_cpu_extension();
        assert_eq!(first, second);
    }

    #[test]
    fn test_detection_never_exceeds_compiled_ceiling() {
        let top = detect_top_cpu_extension();
        assert!(compiled_tiers().contains(top) || top == CpuExtension::Baseline);
    }

    #[test]
    fn test_select_tier_prefers_highest_qualifying() {
        let all = ExtensionSet::baseline_only()
            .with(CpuExtension::Ssse3)
            .with(CpuExtension::Sse42)
            .with(CpuExtension::Avx)
            .with(CpuExtension::Avx2)
            .with(CpuExtension::Avx512);
        assert_eq!(select_tier(CpuExtension::Avx512, all), CpuExtension::Avx512);
        assert_eq!(select_tier(CpuExtension::Avx, all), CpuExtension::Avx);
        assert_eq!(select_tier(CpuExtension::Baseline, all), CpuExtension::Baseline);
    }

    #[test]
    fn test_select_tier_skips_uncompiled_tiers() {
        // Hardware at AVX2 but only baseline + SSE4.2 compiled: SSE4.2 wins,
        // not AVX2, not baseline.
        let compiled = ExtensionSet::baseline_only().with(CpuExtension::Sse42);
        assert_eq!(select_tier(CpuExtension::Avx2, compiled), CpuExtension::Sse42);
    }

    #[test]
    fn test_select_tier_falls_back_to_baseline() {
        // Only a tier above the ceiling compiled: baseline, unconditionally.
        let compiled = ExtensionSet::baseline_only().with(CpuExtension::Avx512);
        assert_eq!(select_tier(CpuExtension::Avx2, compiled), CpuExtension::Baseline);
    }

    #[test]
    fn test_dispatch_invokes_exactly_once() {
        let ctx = CpuContext::new(&host_policy());
        let mut calls = 0;
        let tier = dispatch_by_cpu(&ctx, CountAndRecord { calls: &mut calls });
        assert_eq!(calls, 1);
        assert_eq!(tier, selected_cpu_tier(&ctx));
    }

    #[test]
    fn test_dispatch_respects_policy_ceiling() {
        let policy = host_policy().with_cpu_extensions(CpuExtension::Baseline);
        let ctx = CpuContext::new(&policy);
        assert_eq!(dispatch_by_cpu(&ctx, RecordTier), CpuExtension::Baseline);
    }

    #[test]
    fn test_extension_set_always_contains_baseline() {
        assert!(ExtensionSet::baseline_only().contains(CpuExtension::Baseline));
        assert!(compiled_tiers().contains(CpuExtension::Baseline));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const ALL: [CpuExtension; 6] = [
            CpuExtension::Baseline,
            CpuExtension::Ssse3,
            CpuExtension::Sse42,
            CpuExtension::Avx,
            CpuExtension::Avx2,
            CpuExtension::Avx512,
        ];

        fn extension() -> impl Strategy<Value = CpuExtension> {
            (0usize..ALL.len()).prop_map(|i| ALL[i])
        }

        fn extension_set() -> impl Strategy<Value = ExtensionSet> {
            prop::collection::vec(extension(), 0..6).prop_map(|exts| {
                exts.into_iter()
                    .fold(ExtensionSet::baseline_only(), ExtensionSet::with)
            })
        }

        proptest! {
            /// Selection never exceeds the requested ceiling.
            #[test]
            fn prop_selection_bounded_by_ceiling(
                ceiling in extension(),
                compiled in extension_set(),
            ) {
                prop_assert!(select_tier(ceiling, compiled) <= ceiling);
            }

            /// Selection is always a compiled-in tier.
            #[test]
            fn prop_selection_is_compiled(
                ceiling in extension(),
                compiled in extension_set(),
            ) {
                prop_assert!(compiled.contains(select_tier(ceiling, compiled)));
            }

            /// No compiled tier strictly between the selection and the
            /// ceiling exists (the selection is the highest qualifier).
            #[test]
            fn prop_selection_is_maximal(
                ceiling in extension(),
                compiled in extension_set(),
            ) {
                let picked = select_tier(ceiling, compiled);
                for ext in ALL {
                    if ext > picked && ext <= ceiling {
                        prop_assert!(!compiled.contains(ext));
                    }
                }
            }
        }
    }
}
