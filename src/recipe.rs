use crate::CTCF_ANCHOR;
use crate::annotation::Metadata;
use crate::builder::SequenceBuilder;
use crate::construct::Construct;
use crate::error::AssemblyError;
use crate::filler::FillerCycler;
use crate::part::{Module, Orientation, PartRegistry};
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Fixed reserved coordinates of the construct family. Defaults match the
/// canonical 1 MiB layout with the promoter at 500 kb.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructLayout {
    pub target_length: usize,
    pub promoter_pos: usize,
    pub enhancer_pos: usize,
    pub domain_start: usize,
    pub anchor_left_pos: usize,
    pub anchor_right_pos: usize,
    pub relocated_enhancer_pos: usize,
}

impl Default for ConstructLayout {
    fn default() -> Self {
        Self {
            target_length: 1_048_576,
            promoter_pos: 500_000,
            enhancer_pos: 400_000,
            domain_start: 250_000,
            anchor_left_pos: 350_000,
            anchor_right_pos: 450_000,
            relocated_enhancer_pos: 800_000,
        }
    }
}

/// One oriented module placement within a pair recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModulePlacement {
    pub module: String,
    pub orientation: Orientation,
}

fn forward() -> Orientation {
    Orientation::Forward
}

/// Heterotypic cocktail description: an ordered module set with per-slot
/// orientations, repeated `repeat_count` times with configurable spacing,
/// optionally bracketed by CTCF and separated by a dedicated module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocktailRecipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub promoter: String,
    pub module_order: Vec<String>,
    pub orientation_pattern: Vec<Orientation>,
    pub module_spacing: usize,
    pub repeat_spacing: usize,
    pub repeat_count: usize,
    #[serde(default)]
    pub ctcf_brackets: bool,
    #[serde(default)]
    pub repeat_separator: Option<String>,
    #[serde(default = "forward")]
    pub repeat_separator_orientation: Orientation,
}

/// Structural deviations from the intact-loop baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantKind {
    LoopIntact,
    LoopInverted,
    LoopDeleted,
    LoopRelocated,
}

impl VariantKind {
    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::LoopIntact => "LoopIntact",
            VariantKind::LoopInverted => "LoopInverted",
            VariantKind::LoopDeleted => "LoopDeleted",
            VariantKind::LoopRelocated => "LoopRelocated",
        }
    }
}

/// Declarative construct description. Recipes are pure data: one is
/// instantiated per experiment condition and reused to drive any number of
/// builder runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Recipe {
    /// Pure background, no parts at all.
    FillerOnly,
    /// Promoter at its reserved position, rest is background.
    PromoterOnly { promoter: String },
    /// `copies` tandem copies of one enhancer as a single block. With
    /// `offset` the block starts there; without, it abuts the promoter.
    Stacking {
        enhancer: String,
        promoter: String,
        copies: usize,
        #[serde(default)]
        offset: Option<usize>,
    },
    /// Single enhancer ending exactly `distance` bp upstream of the
    /// promoter start.
    Distance {
        enhancer: String,
        promoter: String,
        distance: usize,
    },
    /// One or two oriented enhancers in the upstream domain, with optional
    /// separator module between them.
    Pair {
        first: ModulePlacement,
        #[serde(default)]
        second: Option<ModulePlacement>,
        promoter: String,
        spacing: usize,
        #[serde(default)]
        separator: Option<String>,
    },
    Cocktail(CocktailRecipe),
    /// Two transcription-factor sites, either of which may be absent
    /// (recorded as a zero-width feature). `spacing` is start-to-start.
    LogicGate {
        #[serde(default)]
        site_a: Option<String>,
        #[serde(default)]
        site_b: Option<String>,
        promoter: String,
        spacing: usize,
    },
    /// CTCF-anchored loop around an enhancer block, with the variant
    /// describing the deviation from the intact baseline.
    StructuralVariant {
        enhancer: String,
        promoter: String,
        variant: VariantKind,
        copies: usize,
    },
}

fn format_span(bp: usize) -> String {
    if bp >= 1000 && bp % 1000 == 0 {
        format!("{}kb", bp / 1000)
    } else {
        format!("{bp}bp")
    }
}

impl Recipe {
    /// Stable construct name, used for FASTA files and manifest entries.
    pub fn name(&self) -> String {
        match self {
            Recipe::FillerOnly => "FillerOnly".to_string(),
            Recipe::PromoterOnly { promoter } => format!("NoEnhancer_{promoter}"),
            Recipe::Stacking {
                enhancer,
                copies,
                offset,
                ..
            } => match offset {
                Some(_) => format!("Stack_{enhancer}_{copies}x"),
                None => format!("Stack_{enhancer}_{copies}x_proximal"),
            },
            Recipe::Distance {
                enhancer, distance, ..
            } => format!("Distance_{}_{enhancer}", format_span(*distance)),
            Recipe::Pair {
                first,
                second,
                spacing,
                separator,
                ..
            } => match second {
                None => format!("Single_{}", first.module),
                Some(second) => {
                    let base = format!(
                        "Pair_{}{}_{}{}_{}",
                        first.module,
                        first.orientation,
                        second.module,
                        second.orientation,
                        format_span(*spacing)
                    );
                    match separator {
                        Some(separator) => format!("{base}_{separator}sep"),
                        None => base,
                    }
                }
            },
            Recipe::Cocktail(config) => config.name.clone(),
            Recipe::LogicGate { site_a, site_b, .. } => format!(
                "Gate_{}_{}",
                site_a.as_deref().unwrap_or("EMPTY"),
                site_b.as_deref().unwrap_or("EMPTY")
            ),
            Recipe::StructuralVariant {
                variant, copies, ..
            } => format!("{}_{copies}x", variant.label()),
        }
    }
}

/// All four orientation combinations of a module pair, for experiments
/// testing strand-dependent effects (CTCF anchor polarity in particular).
pub fn orientation_grid(first: &str, second: &str, promoter: &str, spacing: usize) -> Vec<Recipe> {
    iproduct!(
        [Orientation::Forward, Orientation::Reverse],
        [Orientation::Forward, Orientation::Reverse]
    )
    .map(|(first_orientation, second_orientation)| Recipe::Pair {
        first: ModulePlacement {
            module: first.to_string(),
            orientation: first_orientation,
        },
        second: Some(ModulePlacement {
            module: second.to_string(),
            orientation: second_orientation,
        }),
        promoter: promoter.to_string(),
        spacing,
        separator: None,
    })
    .collect()
}

/// Interprets recipes against a part registry, a filler source and a fixed
/// layout. One assembler drives any number of builds; every build gets its
/// own builder and filler cycler, so batch runs can proceed in parallel.
#[derive(Clone, Debug)]
pub struct Assembler {
    registry: PartRegistry,
    filler: Vec<u8>,
    layout: ConstructLayout,
}

impl Assembler {
    pub fn new(
        registry: PartRegistry,
        filler: Vec<u8>,
        layout: ConstructLayout,
    ) -> Result<Self, AssemblyError> {
        if filler.is_empty() {
            return Err(AssemblyError::EmptyFiller);
        }
        Ok(Self {
            registry,
            filler,
            layout,
        })
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &ConstructLayout {
        &self.layout
    }

    pub fn build(&self, recipe: &Recipe) -> Result<Construct, AssemblyError> {
        self.build_seeded(recipe, None)
    }

    /// Builds one construct. With a seed the filler is permuted first,
    /// producing a technical replicate that differs only in background.
    pub fn build_seeded(
        &self,
        recipe: &Recipe,
        filler_seed: Option<u64>,
    ) -> Result<Construct, AssemblyError> {
        let cycler = match filler_seed {
            Some(seed) => FillerCycler::permuted(self.filler.clone(), seed)?,
            None => FillerCycler::new(self.filler.clone())?,
        };
        let mut builder = SequenceBuilder::with_capacity(cycler, self.layout.target_length);

        match recipe {
            Recipe::FillerOnly => {}
            Recipe::PromoterOnly { promoter } => {
                builder.append_filler(self.layout.promoter_pos, Some("upstream_filler"))?;
                self.place_promoter_at_reserved(&mut builder, promoter, "promoter-only layout")?;
            }
            Recipe::Stacking {
                enhancer,
                promoter,
                copies,
                offset,
            } => self.run_stacking(&mut builder, enhancer, promoter, *copies, *offset)?,
            Recipe::Distance {
                enhancer,
                promoter,
                distance,
            } => self.run_distance(&mut builder, enhancer, promoter, *distance)?,
            Recipe::Pair {
                first,
                second,
                promoter,
                spacing,
                separator,
            } => self.run_pair(
                &mut builder,
                first,
                second.as_ref(),
                promoter,
                *spacing,
                separator.as_deref(),
            )?,
            Recipe::Cocktail(config) => self.run_cocktail(&mut builder, config)?,
            Recipe::LogicGate {
                site_a,
                site_b,
                promoter,
                spacing,
            } => self.run_logic_gate(
                &mut builder,
                site_a.as_deref(),
                site_b.as_deref(),
                promoter,
                *spacing,
            )?,
            Recipe::StructuralVariant {
                enhancer,
                promoter,
                variant,
                copies,
            } => {
                self.run_structural_variant(&mut builder, enhancer, promoter, *variant, *copies)?
            }
        }

        builder.finish(self.layout.target_length)
    }

    fn append_promoter(
        &self,
        builder: &mut SequenceBuilder,
        module: &Module,
    ) -> Result<(), AssemblyError> {
        let mut metadata = Metadata::new();
        metadata.insert("length".to_string(), json!(module.len()));
        builder.append_module(module, Orientation::Forward, "promoter", metadata)
    }

    /// The explicit pre-promoter guard: upstream content must not have
    /// passed the reserved promoter position. This is where oversized
    /// stacks and cocktails fail, with a message naming the recipe.
    fn place_promoter_at_reserved(
        &self,
        builder: &mut SequenceBuilder,
        promoter: &str,
        context: &str,
    ) -> Result<(), AssemblyError> {
        let module = self.registry.get(promoter)?;
        if builder.cursor() > self.layout.promoter_pos {
            return Err(AssemblyError::ConstructOverflow {
                cursor: builder.cursor(),
                limit: self.layout.promoter_pos,
                context: format!("{context} overruns the reserved promoter position"),
            });
        }
        if builder.cursor() < self.layout.promoter_pos {
            builder.append_filler(
                self.layout.promoter_pos - builder.cursor(),
                Some("spacer_to_promoter"),
            )?;
        }
        self.append_promoter(builder, module)
    }

    fn run_stacking(
        &self,
        builder: &mut SequenceBuilder,
        enhancer: &str,
        promoter: &str,
        copies: usize,
        offset: Option<usize>,
    ) -> Result<(), AssemblyError> {
        let module = self.registry.get(enhancer)?;
        let block_len = module.len() * copies;
        let start = match offset {
            Some(position) => position,
            None => self.layout.promoter_pos.checked_sub(block_len).ok_or(
                AssemblyError::ConstructOverflow {
                    cursor: block_len,
                    limit: self.layout.promoter_pos,
                    context: format!(
                        "{copies} copies of '{enhancer}' do not fit upstream of the promoter"
                    ),
                },
            )?,
        };
        builder.append_filler(start, Some("upstream_filler"))?;
        builder.append_module_block(
            module,
            Orientation::Forward,
            copies,
            "enhancer_block",
            Metadata::new(),
        )?;
        self.place_promoter_at_reserved(
            builder,
            promoter,
            &format!("{copies}x '{enhancer}' stack"),
        )
    }

    fn run_distance(
        &self,
        builder: &mut SequenceBuilder,
        enhancer: &str,
        promoter: &str,
        distance: usize,
    ) -> Result<(), AssemblyError> {
        let module = self.registry.get(enhancer)?;
        let upstream = self
            .layout
            .promoter_pos
            .checked_sub(distance + module.len())
            .ok_or(AssemblyError::ConstructOverflow {
                cursor: distance + module.len(),
                limit: self.layout.promoter_pos,
                context: format!(
                    "Distance {distance} puts '{enhancer}' before the construct start"
                ),
            })?;
        builder.append_filler(upstream, Some("upstream_filler"))?;
        let mut metadata = Metadata::new();
        metadata.insert("distance".to_string(), json!(distance));
        builder.append_module(module, Orientation::Forward, "enhancer", metadata)?;
        builder.append_filler(distance, Some("spacer"))?;
        self.place_promoter_at_reserved(builder, promoter, "distance layout")
    }

    fn run_pair(
        &self,
        builder: &mut SequenceBuilder,
        first: &ModulePlacement,
        second: Option<&ModulePlacement>,
        promoter: &str,
        spacing: usize,
        separator: Option<&str>,
    ) -> Result<(), AssemblyError> {
        builder.append_filler(self.layout.domain_start, Some("upstream_filler"))?;
        let module = self.registry.get(&first.module)?;
        builder.append_module(module, first.orientation, "enhancer1", Metadata::new())?;

        if let Some(second) = second {
            if let Some(separator) = separator {
                let separator = self.registry.get(separator)?;
                builder.append_module(
                    separator,
                    Orientation::Forward,
                    "separator",
                    Metadata::new(),
                )?;
            }
            builder.append_filler(spacing, Some("inter_enhancer_spacing"))?;
            let module = self.registry.get(&second.module)?;
            builder.append_module(module, second.orientation, "enhancer2", Metadata::new())?;
        }

        self.place_promoter_at_reserved(builder, promoter, "enhancer pair")
    }

    fn run_cocktail(
        &self,
        builder: &mut SequenceBuilder,
        config: &CocktailRecipe,
    ) -> Result<(), AssemblyError> {
        if config.module_order.len() != config.orientation_pattern.len() {
            return Err(AssemblyError::RecipeMismatch(format!(
                "Orientation pattern length must match module order ({})",
                config.name
            )));
        }

        builder.append_filler(self.layout.domain_start, Some("upstream_filler"))?;

        if config.ctcf_brackets {
            self.append_bracket(builder, Orientation::Forward, "left")?;
        }

        for repeat_idx in 0..config.repeat_count {
            for (order_idx, module_name) in config.module_order.iter().enumerate() {
                let module = self.registry.get(module_name)?;
                let orientation = config.orientation_pattern[order_idx];
                let mut metadata = Metadata::new();
                metadata.insert("repeat_index".to_string(), json!(repeat_idx));
                metadata.insert("order_index".to_string(), json!(order_idx));
                builder.append_module(module, orientation, "enhancer_module", metadata)?;

                if order_idx + 1 < config.module_order.len() {
                    builder.append_filler(config.module_spacing, Some("module_spacing"))?;
                }
            }

            if let Some(separator) = &config.repeat_separator {
                let separator = self.registry.get(separator)?;
                let mut metadata = Metadata::new();
                metadata.insert("repeat_index".to_string(), json!(repeat_idx));
                builder.append_module(
                    separator,
                    config.repeat_separator_orientation,
                    "repeat_separator",
                    metadata,
                )?;
            }

            if repeat_idx + 1 < config.repeat_count {
                builder.append_filler(config.repeat_spacing, Some("repeat_spacing"))?;
            }
        }

        if config.ctcf_brackets {
            self.append_bracket(builder, Orientation::Reverse, "right")?;
        }

        self.place_promoter_at_reserved(builder, &config.promoter, &config.name)
    }

    fn append_bracket(
        &self,
        builder: &mut SequenceBuilder,
        orientation: Orientation,
        anchor: &str,
    ) -> Result<(), AssemblyError> {
        let ctcf = self.registry.get("CTCF")?;
        let mut metadata = Metadata::new();
        metadata.insert("anchor".to_string(), json!(anchor));
        builder.append_module(ctcf, orientation, "ctcf_bracket", metadata)?;
        let mut event_metadata = Metadata::new();
        event_metadata.insert("anchor".to_string(), json!(anchor));
        builder.record_event("ctcf_bracket_added", event_metadata)
    }

    fn run_logic_gate(
        &self,
        builder: &mut SequenceBuilder,
        site_a: Option<&str>,
        site_b: Option<&str>,
        promoter: &str,
        spacing: usize,
    ) -> Result<(), AssemblyError> {
        builder.append_filler(self.layout.domain_start, Some("upstream_filler"))?;
        let site_a_len = self.place_gate_site(builder, site_a, "tf_a_site")?;
        builder.append_filler(spacing.saturating_sub(site_a_len), Some("tf_spacer"))?;
        self.place_gate_site(builder, site_b, "tf_b_site")?;
        self.place_promoter_at_reserved(builder, promoter, "logic gate")
    }

    fn place_gate_site(
        &self,
        builder: &mut SequenceBuilder,
        site: Option<&str>,
        label: &str,
    ) -> Result<usize, AssemblyError> {
        match site {
            Some(name) => {
                let module = self.registry.get(name)?;
                builder.append_module(module, Orientation::Forward, label, Metadata::new())?;
                Ok(module.len())
            }
            None => {
                // Truth-table 0 input: the site is deliberately absent, but
                // its position is still documented.
                let mut metadata = Metadata::new();
                metadata.insert("module".to_string(), json!("EMPTY"));
                metadata.insert("orientation".to_string(), json!("n/a"));
                builder.append_sequence(b"", Some(label), metadata)?;
                Ok(0)
            }
        }
    }

    fn append_anchor(
        &self,
        builder: &mut SequenceBuilder,
        orientation: Orientation,
        anchor: &str,
    ) -> Result<(), AssemblyError> {
        let mut metadata = Metadata::new();
        metadata.insert("anchor".to_string(), json!(anchor));
        metadata.insert("orientation".to_string(), json!(orientation.symbol()));
        builder.append_sequence(&CTCF_ANCHOR.oriented(orientation), Some("ctcf_anchor"), metadata)
    }

    fn run_structural_variant(
        &self,
        builder: &mut SequenceBuilder,
        enhancer: &str,
        promoter: &str,
        variant: VariantKind,
        copies: usize,
    ) -> Result<(), AssemblyError> {
        let module = self.registry.get(enhancer)?;
        let promoter_module = self.registry.get(promoter)?;
        let layout = &self.layout;

        builder.append_to(layout.anchor_left_pos)?;
        self.append_anchor(builder, Orientation::Forward, "left")?;
        builder.append_to(layout.enhancer_pos)?;

        match variant {
            VariantKind::LoopIntact | VariantKind::LoopInverted | VariantKind::LoopDeleted => {
                builder.append_module_block(
                    module,
                    Orientation::Forward,
                    copies,
                    "enhancer_block",
                    Metadata::new(),
                )?;
            }
            VariantKind::LoopRelocated => {
                let mut metadata = Metadata::new();
                metadata.insert("copies".to_string(), json!(copies));
                builder.record_event("enhancer_removed_from_loop", metadata)?;
            }
        }

        builder.append_to(layout.anchor_right_pos)?;
        let right_orientation = match variant {
            // Flipping the right anchor breaks loop polarity while keeping
            // the enhancer position constant.
            VariantKind::LoopInverted => Orientation::Forward,
            _ => Orientation::Reverse,
        };
        self.append_anchor(builder, right_orientation, "right")?;

        match variant {
            VariantKind::LoopIntact | VariantKind::LoopInverted => {
                let spacer = layout.promoter_pos.saturating_sub(builder.cursor());
                if spacer > 0 {
                    let mut metadata = Metadata::new();
                    metadata.insert("length".to_string(), json!(spacer));
                    builder.record_event("spacer_retained", metadata)?;
                    builder.append_filler(spacer, Some("loop_spacer"))?;
                }
                self.append_promoter(builder, promoter_module)?;
                if variant == VariantKind::LoopInverted {
                    let mut metadata = Metadata::new();
                    metadata.insert("anchor".to_string(), json!("right"));
                    builder.record_event("anchor_inverted", metadata)?;
                }
            }
            VariantKind::LoopDeleted => {
                let deleted = layout.promoter_pos.saturating_sub(builder.cursor());
                if deleted > 0 {
                    let mut metadata = Metadata::new();
                    metadata.insert("length".to_string(), json!(deleted));
                    builder.record_event("spacer_deleted", metadata)?;
                }
                self.append_promoter(builder, promoter_module)?;
            }
            VariantKind::LoopRelocated => {
                builder.append_to(layout.promoter_pos)?;
                self.append_promoter(builder, promoter_module)?;
                builder.append_to(layout.relocated_enhancer_pos)?;
                builder.append_module_block(
                    module,
                    Orientation::Forward,
                    copies,
                    "enhancer_block",
                    Metadata::new(),
                )?;
                let mut metadata = Metadata::new();
                metadata.insert("to".to_string(), json!(layout.relocated_enhancer_pos));
                metadata.insert("copies".to_string(), json!(copies));
                builder.record_event("enhancer_relocated", metadata)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_sequence(pattern: &str, length: usize) -> String {
        pattern.chars().cycle().take(length).collect()
    }

    fn test_registry() -> PartRegistry {
        let mut registry = PartRegistry::new();
        registry.insert(Module::new("HS2", &pattern_sequence("AGGCT", 1001)));
        registry.insert(Module::new("GATA1", &pattern_sequence("GATAA", 200)));
        registry.insert(Module::new("HNF4A", &pattern_sequence("CAAAG", 150)));
        registry.insert(Module::new("HBG1", &pattern_sequence("TATAA", 500)));
        registry.insert(Module::new("CTCF", "CCGCGTGGTGGCAGGAGC"));
        registry
    }

    fn test_assembler() -> Assembler {
        let filler = pattern_sequence("ACGTT", 10_000).into_bytes();
        Assembler::new(test_registry(), filler, ConstructLayout::default()).unwrap()
    }

    fn find<'a>(
        construct: &'a crate::construct::Construct,
        label: &str,
    ) -> &'a crate::annotation::Feature {
        construct
            .features()
            .iter()
            .find(|feature| feature.label == label)
            .unwrap()
    }

    #[test]
    fn filler_only_is_cyclic_with_one_padding_feature() {
        let assembler = test_assembler();
        let construct = assembler.build(&Recipe::FillerOnly).unwrap();

        assert_eq!(construct.len(), 1_048_576);
        assert_eq!(construct.features().len(), 1);
        let padding = &construct.features()[0];
        assert_eq!(padding.label, crate::builder::DOWNSTREAM_FILLER_LABEL);
        assert_eq!((padding.start, padding.end), (0, 1_048_576));

        let filler = pattern_sequence("ACGTT", 10_000).into_bytes();
        for (i, base) in construct.sequence().iter().enumerate() {
            assert_eq!(*base, filler[i % filler.len()], "mismatch at {i}");
        }
    }

    #[test]
    fn promoter_only_places_promoter_at_reserved_position() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::PromoterOnly {
                promoter: "HBG1".to_string(),
            })
            .unwrap();

        assert_eq!(construct.len(), 1_048_576);
        let promoter = find(&construct, "promoter");
        assert_eq!((promoter.start, promoter.end), (500_000, 500_500));
        assert_eq!(
            construct.feature_bytes(promoter).unwrap(),
            pattern_sequence("TATAA", 500).as_bytes()
        );
    }

    #[test]
    fn stacking_records_single_block_feature_with_copy_count() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::Stacking {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                copies: 10,
                offset: Some(400_000),
            })
            .unwrap();

        assert_eq!(construct.len(), 1_048_576);
        let block = find(&construct, "enhancer_block");
        assert_eq!((block.start, block.end), (400_000, 410_010));
        assert_eq!(block.metadata["copies"], 10);
        assert_eq!(block.metadata["unit_length"], 1001);
        let unit = pattern_sequence("AGGCT", 1001).into_bytes();
        assert_eq!(construct.feature_bytes(block).unwrap(), unit.repeat(10));

        let promoter = find(&construct, "promoter");
        assert_eq!(promoter.start, 500_000);
    }

    #[test]
    fn oversized_stack_fails_the_promoter_overflow_check() {
        // 320 copies of a 1001 bp enhancer are 320,320 bp: too large for the
        // 100 kb between the 400 kb offset and the 500 kb promoter.
        let assembler = test_assembler();
        let err = assembler
            .build(&Recipe::Stacking {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                copies: 320,
                offset: Some(400_000),
            })
            .unwrap_err();

        match err {
            AssemblyError::ConstructOverflow {
                cursor,
                limit,
                context,
            } => {
                assert_eq!(cursor, 720_320);
                assert_eq!(limit, 500_000);
                assert!(context.contains("320x 'HS2' stack"));
            }
            other => panic!("expected ConstructOverflow, got {other:?}"),
        }
    }

    #[test]
    fn proximal_stack_abuts_the_promoter() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::Stacking {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                copies: 1,
                offset: None,
            })
            .unwrap();

        let block = find(&construct, "enhancer_block");
        assert_eq!((block.start, block.end), (498_999, 500_000));
        let promoter = find(&construct, "promoter");
        assert_eq!(promoter.start, 500_000);
        // No spacer between block and promoter
        assert!(
            construct
                .features()
                .iter()
                .all(|feature| feature.label != "spacer_to_promoter")
        );
    }

    #[test]
    fn distance_recipe_places_enhancer_exactly_upstream() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::Distance {
                enhancer: "GATA1".to_string(),
                promoter: "HBG1".to_string(),
                distance: 25_000,
            })
            .unwrap();

        let enhancer = find(&construct, "enhancer");
        assert_eq!(enhancer.end, 500_000 - 25_000);
        assert_eq!(enhancer.len(), 200);
        let spacer = find(&construct, "spacer");
        assert_eq!((spacer.start, spacer.end), (475_000, 500_000));
    }

    #[test]
    fn orientation_passes_through_unchanged() {
        let assembler = test_assembler();
        let forward_forward = Recipe::Pair {
            first: ModulePlacement {
                module: "HS2".to_string(),
                orientation: Orientation::Forward,
            },
            second: Some(ModulePlacement {
                module: "GATA1".to_string(),
                orientation: Orientation::Forward,
            }),
            promoter: "HBG1".to_string(),
            spacing: 5_000,
            separator: None,
        };
        let forward_reverse = Recipe::Pair {
            first: ModulePlacement {
                module: "HS2".to_string(),
                orientation: Orientation::Forward,
            },
            second: Some(ModulePlacement {
                module: "GATA1".to_string(),
                orientation: Orientation::Reverse,
            }),
            promoter: "HBG1".to_string(),
            spacing: 5_000,
            separator: None,
        };

        let plus_plus = assembler.build(&forward_forward).unwrap();
        let plus_minus = assembler.build(&forward_reverse).unwrap();

        // Same spans and labels either way
        let spans_plus_plus: Vec<(String, usize, usize)> = plus_plus
            .features()
            .iter()
            .map(|f| (f.label.clone(), f.start, f.end))
            .collect();
        let spans_plus_minus: Vec<(String, usize, usize)> = plus_minus
            .features()
            .iter()
            .map(|f| (f.label.clone(), f.start, f.end))
            .collect();
        assert_eq!(spans_plus_plus, spans_plus_minus);

        // Bytes differ exactly within the second module's span
        let second = find(&plus_plus, "enhancer2");
        assert_ne!(
            plus_plus.feature_bytes(second).unwrap(),
            plus_minus.feature_bytes(second).unwrap()
        );
        assert_eq!(
            &plus_plus.sequence()[..second.start],
            &plus_minus.sequence()[..second.start]
        );
        assert_eq!(
            &plus_plus.sequence()[second.end..],
            &plus_minus.sequence()[second.end..]
        );
    }

    #[test]
    fn replicate_seeds_change_filler_but_not_parts() {
        let assembler = test_assembler();
        let recipe = Recipe::Distance {
            enhancer: "GATA1".to_string(),
            promoter: "HBG1".to_string(),
            distance: 10_000,
        };

        let rep1 = assembler.build_seeded(&recipe, Some(42)).unwrap();
        let rep2 = assembler.build_seeded(&recipe, Some(987)).unwrap();
        let rep1_again = assembler.build_seeded(&recipe, Some(42)).unwrap();

        assert_eq!(rep1.sequence(), rep1_again.sequence());
        assert_ne!(rep1.sequence(), rep2.sequence());

        for label in ["enhancer", "promoter"] {
            let feature = find(&rep1, label);
            assert_eq!(
                rep1.feature_bytes(feature).unwrap(),
                rep2.feature_bytes(feature).unwrap(),
                "biological span '{label}' must not depend on the filler seed"
            );
        }
        let upstream = find(&rep1, "upstream_filler");
        assert_ne!(
            rep1.feature_bytes(upstream).unwrap(),
            rep2.feature_bytes(upstream).unwrap()
        );
    }

    #[test]
    fn cocktail_layout_and_annotations() {
        let assembler = test_assembler();
        let recipe = Recipe::Cocktail(CocktailRecipe {
            name: "Cocktail_5kbForward".to_string(),
            description: "HS2-GATA1-HNF4A repeated 3x".to_string(),
            promoter: "HBG1".to_string(),
            module_order: vec!["HS2".to_string(), "GATA1".to_string(), "HNF4A".to_string()],
            orientation_pattern: vec![
                Orientation::Forward,
                Orientation::Forward,
                Orientation::Forward,
            ],
            module_spacing: 5_000,
            repeat_spacing: 5_000,
            repeat_count: 3,
            ctcf_brackets: true,
            repeat_separator: None,
            repeat_separator_orientation: Orientation::Forward,
        });

        let construct = assembler.build(&recipe).unwrap();
        assert_eq!(construct.len(), 1_048_576);

        let modules: Vec<_> = construct
            .features()
            .iter()
            .filter(|feature| feature.label == "enhancer_module")
            .collect();
        assert_eq!(modules.len(), 9);
        assert_eq!(modules[0].start, 250_000 + 18);
        assert_eq!(modules[0].metadata["repeat_index"], 0);
        assert_eq!(modules[8].metadata["repeat_index"], 2);
        assert_eq!(modules[8].metadata["order_index"], 2);

        let brackets: Vec<_> = construct
            .features()
            .iter()
            .filter(|feature| feature.label == "ctcf_bracket")
            .collect();
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[0].metadata["orientation"], "+");
        assert_eq!(brackets[1].metadata["orientation"], "-");
        assert_eq!(construct.events().len(), 2);

        let promoter = find(&construct, "promoter");
        assert_eq!(promoter.start, 500_000);
    }

    #[test]
    fn cocktail_overflow_names_the_recipe() {
        let assembler = test_assembler();
        let recipe = Recipe::Cocktail(CocktailRecipe {
            name: "Cocktail_TooDense".to_string(),
            description: String::new(),
            promoter: "HBG1".to_string(),
            module_order: vec!["HS2".to_string()],
            orientation_pattern: vec![Orientation::Forward],
            module_spacing: 0,
            repeat_spacing: 1_000,
            repeat_count: 200,
            ctcf_brackets: false,
            repeat_separator: None,
            repeat_separator_orientation: Orientation::Forward,
        });

        // 200 repeats of 1001 bp plus 199 kb of spacing from 250 kb onward
        // run far past the 500 kb promoter position.
        let err = assembler.build(&recipe).unwrap_err();
        match err {
            AssemblyError::ConstructOverflow { context, limit, .. } => {
                assert_eq!(limit, 500_000);
                assert!(context.contains("Cocktail_TooDense"));
            }
            other => panic!("expected ConstructOverflow, got {other:?}"),
        }
    }

    #[test]
    fn cocktail_pattern_mismatch_is_rejected() {
        let assembler = test_assembler();
        let recipe = Recipe::Cocktail(CocktailRecipe {
            name: "Cocktail_Bad".to_string(),
            description: String::new(),
            promoter: "HBG1".to_string(),
            module_order: vec!["HS2".to_string(), "GATA1".to_string()],
            orientation_pattern: vec![Orientation::Forward],
            module_spacing: 1_000,
            repeat_spacing: 1_000,
            repeat_count: 1,
            ctcf_brackets: false,
            repeat_separator: None,
            repeat_separator_orientation: Orientation::Forward,
        });

        assert!(matches!(
            assembler.build(&recipe).unwrap_err(),
            AssemblyError::RecipeMismatch(_)
        ));
    }

    #[test]
    fn logic_gate_absent_site_is_zero_width() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::LogicGate {
                site_a: None,
                site_b: Some("GATA1".to_string()),
                promoter: "HBG1".to_string(),
                spacing: 5_000,
            })
            .unwrap();

        let site_a = find(&construct, "tf_a_site");
        assert!(site_a.is_empty());
        assert_eq!(site_a.start, 250_000);
        assert_eq!(site_a.metadata["module"], "EMPTY");

        // spacing is start-to-start
        let site_b = find(&construct, "tf_b_site");
        assert_eq!(site_b.start, 255_000);
        assert_eq!(site_b.len(), 200);
    }

    #[test]
    fn logic_gate_spacing_is_start_to_start_with_present_site() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::LogicGate {
                site_a: Some("GATA1".to_string()),
                site_b: Some("HNF4A".to_string()),
                promoter: "HBG1".to_string(),
                spacing: 5_000,
            })
            .unwrap();

        let site_a = find(&construct, "tf_a_site");
        let site_b = find(&construct, "tf_b_site");
        assert_eq!(site_a.start, 250_000);
        assert_eq!(site_b.start - site_a.start, 5_000);
    }

    #[test]
    fn loop_variants_differ_only_at_the_right_anchor() {
        let assembler = test_assembler();
        let intact = assembler
            .build(&Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopIntact,
                copies: 10,
            })
            .unwrap();
        let inverted = assembler
            .build(&Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopInverted,
                copies: 10,
            })
            .unwrap();

        let right_anchor = intact
            .features()
            .iter()
            .filter(|feature| feature.label == "ctcf_anchor")
            .nth(1)
            .unwrap();
        assert_eq!(right_anchor.start, 450_000);
        assert_eq!(right_anchor.len(), 18);

        assert_ne!(
            intact.feature_bytes(right_anchor).unwrap(),
            inverted.feature_bytes(right_anchor).unwrap()
        );
        assert_eq!(
            &intact.sequence()[..right_anchor.start],
            &inverted.sequence()[..right_anchor.start]
        );
        assert_eq!(
            &intact.sequence()[right_anchor.end..],
            &inverted.sequence()[right_anchor.end..]
        );

        assert!(
            inverted
                .events()
                .iter()
                .any(|event| event.event == "anchor_inverted")
        );
        assert!(
            intact
                .events()
                .iter()
                .all(|event| event.event != "anchor_inverted")
        );
    }

    #[test]
    fn deleted_loop_spacer_abuts_promoter_to_the_block() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopDeleted,
                copies: 10,
            })
            .unwrap();

        // Right anchor ends at 450,018; the promoter follows immediately.
        let promoter = find(&construct, "promoter");
        assert_eq!(promoter.start, 450_018);

        let deleted = construct
            .events()
            .iter()
            .find(|event| event.event == "spacer_deleted")
            .unwrap();
        assert_eq!(deleted.metadata["length"], 500_000 - 450_018);
    }

    #[test]
    fn relocated_loop_moves_the_block_downstream() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopRelocated,
                copies: 10,
            })
            .unwrap();

        let block = find(&construct, "enhancer_block");
        assert_eq!(block.start, 800_000);
        let promoter = find(&construct, "promoter");
        assert_eq!(promoter.start, 500_000);
        assert!(
            construct
                .events()
                .iter()
                .any(|event| event.event == "enhancer_removed_from_loop")
        );
        assert!(
            construct
                .events()
                .iter()
                .any(|event| event.event == "enhancer_relocated")
        );
    }

    #[test]
    fn every_feature_round_trips_to_its_bytes() {
        let assembler = test_assembler();
        let construct = assembler
            .build(&Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopIntact,
                copies: 10,
            })
            .unwrap();

        let mut previous_end = 0;
        for feature in construct.features() {
            assert!(feature.start >= previous_end, "features out of order");
            assert!(construct.feature_bytes(feature).is_some());
            previous_end = feature.end;
        }
        assert_eq!(previous_end, construct.len());
    }

    #[test]
    fn recipe_names_are_stable() {
        assert_eq!(Recipe::FillerOnly.name(), "FillerOnly");
        assert_eq!(
            Recipe::Stacking {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                copies: 320,
                offset: Some(400_000),
            }
            .name(),
            "Stack_HS2_320x"
        );
        assert_eq!(
            Recipe::Distance {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                distance: 25_000,
            }
            .name(),
            "Distance_25kb_HS2"
        );
        assert_eq!(
            Recipe::StructuralVariant {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                variant: VariantKind::LoopIntact,
                copies: 10,
            }
            .name(),
            "LoopIntact_10x"
        );
    }

    #[test]
    fn orientation_grid_covers_all_four_combinations() {
        let grid = orientation_grid("HS2", "CTCF", "HBG1", 5_000);
        assert_eq!(grid.len(), 4);
        let names: Vec<String> = grid.iter().map(Recipe::name).collect();
        assert_eq!(
            names,
            vec![
                "Pair_HS2+_CTCF+_5kb",
                "Pair_HS2+_CTCF-_5kb",
                "Pair_HS2-_CTCF+_5kb",
                "Pair_HS2-_CTCF-_5kb",
            ]
        );
    }

    #[test]
    fn recipes_round_trip_through_json() {
        let recipe = Recipe::Pair {
            first: ModulePlacement {
                module: "HS2".to_string(),
                orientation: Orientation::Forward,
            },
            second: Some(ModulePlacement {
                module: "GATA1".to_string(),
                orientation: Orientation::Reverse,
            }),
            promoter: "HBG1".to_string(),
            spacing: 5_000,
            separator: Some("CTCF".to_string()),
        };
        let json = serde_json::to_string(&recipe).unwrap();
        let parsed: Recipe = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, recipe);

        let literal = r#"{"Stacking": {"enhancer": "HS2", "promoter": "HBG1", "copies": 10}}"#;
        let parsed: Recipe = serde_json::from_str(literal).unwrap();
        assert_eq!(
            parsed,
            Recipe::Stacking {
                enhancer: "HS2".to_string(),
                promoter: "HBG1".to_string(),
                copies: 10,
                offset: None,
            }
        );
    }
}
