use crate::error::BuildError;
use crate::loader::json_loader::TilesetFile;
use crate::settings::BuildSettings;
use crate::spatial::image_slice_rect;
use crate::tileset::annotation::{parse_annotation, AnnotationWarning};
use crate::tileset::artifact::{AdditionalSprite, ArtifactSet, ColliderType, TileArtifact};
use crate::tileset::cache::{ArtifactCache, ArtifactKey};
use crate::tileset::slicer::{AtlasSlicer, ImageSlicer, SlicedRegion};
use crate::tileset::sprite_rect::{RectOrigin, SpriteRect, SpriteRectStore};
use crate::tileset::texture::{PlatformSettingsValidator, SourceTexture, TextureValidator};
use log::{debug, error, info, warn};
use macroquad::math::Vec2;
use std::fmt;

/// Non-fatal findings from a build. Logged and returned with the artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// Reported by the image slicer.
    Slicer(String),
    /// A field-referenced rect covers the same pixels as an earlier rect.
    DuplicateRect {
        /// Name of the rect it duplicates.
        name: String,
        /// Index into the tileset file's `rects`.
        rect_index: usize,
    },
    /// A tile's custom data did not fully parse.
    Annotation {
        /// Tile artifact name.
        tile: String,
        /// What went wrong.
        warning: AnnotationWarning,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::Slicer(msg) => f.write_str(msg),
            BuildWarning::DuplicateRect { name, rect_index } => write!(
                f,
                "rect {rect_index} duplicates \"{name}\"; sharing its artifact"
            ),
            BuildWarning::Annotation { tile, warning } => {
                write!(f, "issue parsing custom data for tile \"{tile}\": {warning}")
            }
        }
    }
}

/// A finished build.
pub struct TilesetBuild {
    /// Everything that was built.
    pub artifacts: ArtifactSet,
    /// Non-fatal findings, already logged.
    pub warnings: Vec<BuildWarning>,
    /// Artifact index -> definition index (tile id for tiles, rect index for
    /// additional sprites), over the combined tiles-then-additional ordering.
    pub definition_index: Vec<usize>,
    /// The sprite rect store changed and should be persisted.
    pub rects_changed: bool,
}

/// Turns a tileset definition and its texture into an [`ArtifactSet`].
pub struct TilesetBuilder<'a> {
    settings: &'a BuildSettings,
    slicer: &'a dyn ImageSlicer,
    validator: &'a dyn TextureValidator,
}

impl<'a> TilesetBuilder<'a> {
    /// A builder using [`AtlasSlicer`] and [`PlatformSettingsValidator`].
    pub fn new(settings: &'a BuildSettings) -> Self {
        TilesetBuilder {
            settings,
            slicer: &AtlasSlicer,
            validator: &PlatformSettingsValidator,
        }
    }

    /// Swaps in another slicing service.
    pub fn with_slicer(mut self, slicer: &'a dyn ImageSlicer) -> Self {
        self.slicer = slicer;
        self
    }

    /// Swaps in another texture check.
    pub fn with_validator(mut self, validator: &'a dyn TextureValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Builds the artifact set. `texture` may only be `None` for a tileset
    /// without an image. On error nothing is returned and `store` is untouched.
    pub fn build(
        &self,
        file: &TilesetFile,
        texture: Option<&SourceTexture>,
        store: &mut SpriteRectStore,
    ) -> Result<TilesetBuild, BuildError> {
        let def = &file.def;
        let result = self.build_inner(file, texture, store);
        match &result {
            Ok(build) => info!(
                "Built tileset \"{}\": {} tiles, {} additional sprites, {} warnings",
                def.identifier,
                build.artifacts.tiles.len(),
                build.artifacts.additional.len(),
                build.warnings.len()
            ),
            Err(err) => error!("Failed to build tileset \"{}\": {err}", def.identifier),
        }
        result
    }

    fn build_inner(
        &self,
        file: &TilesetFile,
        texture: Option<&SourceTexture>,
        store: &mut SpriteRectStore,
    ) -> Result<TilesetBuild, BuildError> {
        let def = &file.def;

        // A tileset without an image is legal and produces nothing.
        if def.is_null_tileset() {
            debug!("Tileset \"{}\" has no image", def.identifier);
            return Ok(TilesetBuild {
                artifacts: ArtifactSet::new(&def.identifier, 0, def.tile_grid_size),
                warnings: Vec::new(),
                definition_index: Vec::new(),
                rects_changed: false,
            });
        }

        if def.is_embed_atlas() {
            if self.settings.internal_icons_texture.is_none() {
                return Err(BuildError::EmbedAtlasNotConfigured(def.identifier.clone()));
            }
        } else if def.rel_path.as_deref().is_some_and(str::is_empty) {
            return Err(BuildError::MissingTexturePath(def.identifier.clone()));
        }

        let texture = texture.ok_or_else(|| BuildError::MissingTexture(def.identifier.clone()))?;
        if !texture.readable || !texture.has_pixel_data() {
            return Err(BuildError::TextureNotReadable(texture.name.clone()));
        }

        // Fail fast, before any slicing work.
        self.validator
            .validate(def, texture)
            .map_err(|issues| BuildError::TextureIssues {
                texture: texture.name.clone(),
                issues,
            })?;

        if texture.width() != def.px_wid || texture.height() != def.px_hei {
            return Err(BuildError::TextureSizeMismatch {
                tileset: def.identifier.clone(),
                expected_w: def.px_wid,
                expected_h: def.px_hei,
                actual_w: texture.width(),
                actual_h: texture.height(),
            });
        }

        let mut warnings = Vec::new();
        let plan = plan_rects(file, &mut warnings);

        // Work on a copy of the store so a failed build leaves it untouched.
        let mut next_store = store.clone();
        let rects_changed = next_store.reconcile(&plan.standard);
        let standard_count = next_store.rects.len();

        let mut all_rects = next_store.rects.clone();
        all_rects.extend(plan.additional.iter().cloned());
        debug!(
            "Slicing {} standard and {} additional rects for \"{}\"",
            standard_count,
            plan.additional.len(),
            def.identifier
        );

        let output = self.slicer.generate(
            &texture.image.bytes,
            texture.width(),
            texture.height(),
            &all_rects,
            &texture.settings,
        );

        for msg in output.warnings {
            warn!("{msg}");
            warnings.push(BuildWarning::Slicer(msg));
        }
        if !output.errors.is_empty() {
            return Err(BuildError::SlicerFailed(output.errors));
        }
        if output.regions.is_empty() {
            return Err(BuildError::NoRegionsGenerated(def.identifier.clone()));
        }
        if output.regions.len() != all_rects.len() {
            return Err(BuildError::RegionCountMismatch {
                expected: all_rects.len(),
                actual: output.regions.len(),
            });
        }

        let ppu = self.settings.pixels_per_unit_for(def.tile_grid_size) as f32;
        let custom_data = def.custom_data_by_tile();
        let mut enum_tags = def.enum_tags_by_tile();
        let mut artifacts = ArtifactSet::new(&def.identifier, def.px_hei, def.tile_grid_size);

        // First pass: every region becomes an artifact, keyed on the rect it
        // was cut for rather than whatever the slicer echoed back.
        for (i, (region, planned)) in output.regions.into_iter().zip(&all_rects).enumerate() {
            let key = ArtifactKey::new(def.identifier.as_str(), planned.rect);
            let definition_index = plan.definition_index[i];

            let committed = if i >= standard_count {
                let sprite = AdditionalSprite {
                    name: planned.name.clone(),
                    rect: planned.rect,
                    image: region.image,
                    rect_index: definition_index,
                };
                artifacts.additional.commit(key, sprite)
            } else {
                let tile_id = definition_index as u32;
                let tile = make_tile(
                    planned,
                    region,
                    definition_index,
                    ppu,
                    custom_data.get(&tile_id).map(|cd| (*cd).to_owned()),
                    enum_tags.remove(&tile_id).unwrap_or_default(),
                );
                artifacts.tiles.commit(key, tile)
            };
            if committed.is_err() {
                return Err(BuildError::DuplicateRegion(planned.name.clone()));
            }
        }

        // Second pass: animation frames may point at any tile built above.
        let tile_count = artifacts.tiles.len();
        for tile in artifacts.tiles.values_mut() {
            let Some(text) = tile.custom_data.as_deref() else {
                continue;
            };
            let parsed = parse_annotation(text, tile_count);
            for warning in parsed.warnings {
                warn!("Issue parsing custom data for tile \"{}\": {warning}", tile.name);
                warnings.push(BuildWarning::Annotation {
                    tile: tile.name.clone(),
                    warning,
                });
            }
            tile.animation = parsed.animation;
        }

        *store = next_store;
        Ok(TilesetBuild {
            artifacts,
            warnings,
            definition_index: plan.definition_index,
            rects_changed,
        })
    }
}

struct RectPlan {
    standard: Vec<SpriteRect>,
    additional: Vec<SpriteRect>,
    definition_index: Vec<usize>,
}

/// Derives the slice list: grid rects first, then field-referenced rects not
/// already covered. Names come from the key, so reordering never renames.
fn plan_rects(file: &TilesetFile, warnings: &mut Vec<BuildWarning>) -> RectPlan {
    let def = &file.def;
    let mut planned: ArtifactCache<SpriteRect> = ArtifactCache::new();
    let mut definition_index = Vec::new();

    for (tile_id, rect) in def.grid_rects().into_iter().enumerate() {
        let key = ArtifactKey::new(def.identifier.as_str(), image_slice_rect(rect, def.px_hei));
        let (_, created) = planned.get_or_create(key, |k| {
            SpriteRect::new(k.name(), k.rect, RectOrigin::Standard)
        });
        if created {
            definition_index.push(tile_id);
        }
    }
    let standard_count = planned.len();

    for (rect_index, rect) in file.rects.iter().enumerate() {
        let key = ArtifactKey::new(
            def.identifier.as_str(),
            image_slice_rect(rect.to_pixel_rect(), def.px_hei),
        );
        let name = key.name();
        let (_, created) = planned.get_or_create(key, |k| {
            SpriteRect::new(k.name(), k.rect, RectOrigin::Additional)
        });
        if created {
            definition_index.push(rect_index);
        } else {
            warn!("Field rect {rect_index} duplicates \"{name}\"");
            warnings.push(BuildWarning::DuplicateRect { name, rect_index });
        }
    }

    let mut standard: Vec<SpriteRect> = planned.values().cloned().collect();
    let additional = standard.split_off(standard_count);
    RectPlan {
        standard,
        additional,
        definition_index,
    }
}

fn make_tile(
    planned: &SpriteRect,
    region: SlicedRegion,
    tile_id: usize,
    pixels_per_unit: f32,
    custom_data: Option<String>,
    enum_tags: Vec<String>,
) -> TileArtifact {
    // Classify in units around the centre, store in pixels from the corner.
    let in_units: Vec<Vec<Vec2>> = region
        .outlines
        .iter()
        .map(|o| o.iter().map(|&p| p / pixels_per_unit).collect())
        .collect();
    let collider = ColliderType::classify(&in_units);

    let half = Vec2::new(planned.rect.width as f32, planned.rect.height as f32) * 0.5;
    let outlines = region
        .outlines
        .into_iter()
        .map(|o| o.into_iter().map(|p| p + half).collect())
        .collect();

    TileArtifact {
        name: planned.name.clone(),
        tile_id,
        rect: planned.rect,
        image: region.image,
        collider,
        outlines,
        custom_data,
        enum_tags,
        animation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::json_loader::{TilesetDefinition, TilesetRectangle};
    use crate::settings::PlatformSettings;
    use crate::tileset::annotation::MinMax;
    use crate::tileset::slicer::SliceOutput;
    use crate::tileset::texture::TextureIssue;
    use macroquad::color::Color;
    use macroquad::texture::Image;

    fn file(custom: &[(u32, &str)], rects: &[(i32, i32, i32, i32)]) -> TilesetFile {
        let def: TilesetDefinition = serde_json::from_value(serde_json::json!({
            "identifier": "Dungeon",
            "relPath": "dungeon.png",
            "pxWid": 32,
            "pxHei": 32,
            "tileGridSize": 16,
            "__cWid": 2,
            "__cHei": 2,
            "customData": custom
                .iter()
                .map(|(id, data)| serde_json::json!({"tileId": id, "data": data}))
                .collect::<Vec<_>>(),
            "enumTags": [{"enumValueId": "Wall", "tileIds": [3]}],
        }))
        .expect("definition");
        TilesetFile {
            def,
            rects: rects
                .iter()
                .map(|&(x, y, w, h)| TilesetRectangle {
                    tileset_uid: 0,
                    x,
                    y,
                    w,
                    h,
                })
                .collect(),
        }
    }

    fn texture() -> SourceTexture {
        SourceTexture::new(
            "dungeon",
            Image::gen_image_color(32, 32, Color::new(1.0, 1.0, 1.0, 1.0)),
            PlatformSettings::default(),
        )
    }

    #[test]
    fn standard_tiles_are_named_by_geometry() {
        let settings = BuildSettings::default();
        let mut store = SpriteRectStore::default();
        let build = TilesetBuilder::new(&settings)
            .build(&file(&[], &[]), Some(&texture()), &mut store)
            .expect("build");

        let names = build.artifacts.region_names();
        // Row 0 of the document is the top of the image.
        assert_eq!(
            names,
            vec![
                "Dungeon_0_16_16_16",
                "Dungeon_16_16_16_16",
                "Dungeon_0_0_16_16",
                "Dungeon_16_0_16_16"
            ]
        );
        assert!(build.rects_changed);
        assert_eq!(store.rects.len(), 4);
        assert_eq!(build.artifacts.tile(3).expect("tile").enum_tags, vec!["Wall"]);
    }

    #[test]
    fn annotations_resolve_in_a_second_pass() {
        let settings = BuildSettings::default();
        let mut store = SpriteRectStore::default();
        let build = TilesetBuilder::new(&settings)
            .build(
                &file(&[(0, "animatedSprites 0, 3, 9\nanimationSpeed 2")], &[]),
                Some(&texture()),
                &mut store,
            )
            .expect("build");

        let tile = build.artifacts.tile(0).expect("tile 0");
        let anim = tile.animation.as_ref().expect("animation");
        assert_eq!(anim.frames, vec![0, 3]);
        assert_eq!(anim.speed, Some(MinMax { min: 2.0, max: 2.0 }));
        assert_eq!(build.warnings.len(), 1);
        assert!(matches!(
            &build.warnings[0],
            BuildWarning::Annotation {
                tile,
                warning: AnnotationWarning::FrameOutOfRange { frame: 9, .. },
            } if tile == "Dungeon_0_16_16_16"
        ));
    }

    #[test]
    fn duplicate_field_rects_share_one_artifact() {
        let settings = BuildSettings::default();
        let mut store = SpriteRectStore::default();
        let build = TilesetBuilder::new(&settings)
            .build(
                &file(&[], &[(0, 0, 32, 16), (0, 0, 16, 16), (0, 0, 32, 16)]),
                Some(&texture()),
                &mut store,
            )
            .expect("build");

        assert_eq!(build.artifacts.tiles.len(), 4);
        assert_eq!(build.artifacts.additional.len(), 1);
        assert_eq!(build.warnings.len(), 2);
        assert_eq!(build.definition_index, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn grid_outline_classifies_and_is_recentred() {
        let settings = BuildSettings::default();
        let mut store = SpriteRectStore::default();
        let tex = texture();
        let builder = TilesetBuilder::new(&settings);
        builder
            .build(&file(&[], &[]), Some(&tex), &mut store)
            .expect("first build");

        let edited = store.get_mut("Dungeon_0_16_16_16").expect("rect");
        edited.outlines = vec![edited.full_outline()];

        let build = builder
            .build(&file(&[], &[]), Some(&tex), &mut store)
            .expect("second build");
        assert!(!build.rects_changed);

        let tile = build.artifacts.tile(0).expect("tile 0");
        assert_eq!(tile.collider, ColliderType::Grid);
        assert!(tile.outlines[0].contains(&Vec2::new(0.0, 0.0)));
        assert!(tile.outlines[0].contains(&Vec2::new(16.0, 16.0)));
        assert_eq!(build.artifacts.tile(1).expect("tile 1").collider, ColliderType::None);
    }

    #[test]
    fn null_tileset_builds_empty() {
        let settings = BuildSettings::default();
        let mut f = file(&[], &[]);
        f.def.rel_path = None;
        let build = TilesetBuilder::new(&settings)
            .build(&f, None, &mut SpriteRectStore::default())
            .expect("build");
        assert!(build.artifacts.is_empty());
    }

    #[test]
    fn embed_atlas_needs_configured_icons() {
        let settings = BuildSettings::default();
        let mut f = file(&[], &[]);
        f.def.rel_path = None;
        f.def.embed_atlas = Some("LdtkIcons".into());
        let err = TilesetBuilder::new(&settings)
            .build(&f, Some(&texture()), &mut SpriteRectStore::default())
            .err()
            .expect("error");
        assert!(matches!(err, BuildError::EmbedAtlasNotConfigured(_)));
    }

    #[test]
    fn empty_rel_path_is_fatal() {
        let settings = BuildSettings::default();
        let mut f = file(&[], &[]);
        f.def.rel_path = Some(String::new());
        let err = TilesetBuilder::new(&settings)
            .build(&f, Some(&texture()), &mut SpriteRectStore::default())
            .err()
            .expect("error");
        assert!(matches!(err, BuildError::MissingTexturePath(_)));
    }

    #[test]
    fn unreadable_texture_is_fatal_and_leaves_store_alone() {
        let settings = BuildSettings::default();
        let mut tex = texture();
        tex.readable = false;
        let mut store = SpriteRectStore::default();
        let err = TilesetBuilder::new(&settings)
            .build(&file(&[], &[]), Some(&tex), &mut store)
            .err()
            .expect("error");
        assert!(matches!(err, BuildError::TextureNotReadable(_)));
        assert!(store.rects.is_empty());
    }

    #[test]
    fn size_mismatch_is_fatal() {
        let settings = BuildSettings::default();
        let tex = SourceTexture::new(
            "small",
            Image::gen_image_color(16, 16, Color::new(1.0, 1.0, 1.0, 1.0)),
            PlatformSettings::default(),
        );
        let err = TilesetBuilder::new(&settings)
            .build(&file(&[], &[]), Some(&tex), &mut SpriteRectStore::default())
            .err()
            .expect("error");
        assert!(matches!(err, BuildError::TextureSizeMismatch { actual_w: 16, .. }));
    }

    struct NoRegions;

    impl ImageSlicer for NoRegions {
        fn generate(
            &self,
            _pixels: &[u8],
            _width: u32,
            _height: u32,
            _rects: &[SpriteRect],
            _platform: &PlatformSettings,
        ) -> SliceOutput {
            SliceOutput::default()
        }
    }

    struct Crashing;

    impl ImageSlicer for Crashing {
        fn generate(
            &self,
            _pixels: &[u8],
            _width: u32,
            _height: u32,
            _rects: &[SpriteRect],
            _platform: &PlatformSettings,
        ) -> SliceOutput {
            SliceOutput {
                errors: vec!["decoder crashed".into()],
                ..SliceOutput::default()
            }
        }
    }

    /// Loses the last region.
    struct ShortCount;

    impl ImageSlicer for ShortCount {
        fn generate(
            &self,
            pixels: &[u8],
            width: u32,
            height: u32,
            rects: &[SpriteRect],
            platform: &PlatformSettings,
        ) -> SliceOutput {
            let mut out = AtlasSlicer.generate(pixels, width, height, rects, platform);
            out.regions.pop();
            out
        }
    }

    /// Echoes the first region's rect back for every region.
    struct SameRect;

    impl ImageSlicer for SameRect {
        fn generate(
            &self,
            pixels: &[u8],
            width: u32,
            height: u32,
            rects: &[SpriteRect],
            platform: &PlatformSettings,
        ) -> SliceOutput {
            let mut out = AtlasSlicer.generate(pixels, width, height, rects, platform);
            let first = out.regions[0].rect;
            for region in &mut out.regions {
                region.rect = first;
            }
            out
        }
    }

    struct NotASprite;

    impl TextureValidator for NotASprite {
        fn validate(
            &self,
            _definition: &TilesetDefinition,
            _texture: &SourceTexture,
        ) -> Result<(), Vec<TextureIssue>> {
            Err(vec![TextureIssue::Other("texture type is not Sprite".into())])
        }
    }

    /// A store that a successful build would rewrite: it carries a stale rect.
    fn stale_store() -> SpriteRectStore {
        let settings = BuildSettings::default();
        let mut store = SpriteRectStore::default();
        TilesetBuilder::new(&settings)
            .build(&file(&[], &[]), Some(&texture()), &mut store)
            .expect("build");
        store.rects.push(SpriteRect::new(
            "Dungeon_stale",
            crate::spatial::PixelRect::new(0, 0, 8, 8),
            RectOrigin::Standard,
        ));
        store
    }

    fn build_with(
        slicer: &dyn ImageSlicer,
        store: &mut SpriteRectStore,
    ) -> Result<TilesetBuild, BuildError> {
        let settings = BuildSettings::default();
        TilesetBuilder::new(&settings).with_slicer(slicer).build(
            &file(&[], &[(0, 0, 32, 16)]),
            Some(&texture()),
            store,
        )
    }

    #[test]
    fn empty_slicer_output_is_fatal() {
        let mut store = stale_store();
        let before = store.clone();
        let err = build_with(&NoRegions, &mut store).err().expect("error");
        assert!(matches!(err, BuildError::NoRegionsGenerated(ref id) if id == "Dungeon"));
        assert_eq!(store, before);
    }

    #[test]
    fn slicer_errors_are_fatal() {
        let mut store = stale_store();
        let before = store.clone();
        let err = build_with(&Crashing, &mut store).err().expect("error");
        assert!(matches!(err, BuildError::SlicerFailed(ref errs) if errs == &["decoder crashed"]));
        assert_eq!(store, before);
    }

    #[test]
    fn region_count_mismatch_is_fatal() {
        let mut store = stale_store();
        let before = store.clone();
        let err = build_with(&ShortCount, &mut store).err().expect("error");
        assert!(matches!(
            err,
            BuildError::RegionCountMismatch {
                expected: 5,
                actual: 4
            }
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn artifacts_are_keyed_on_the_requested_rects() {
        let mut store = SpriteRectStore::default();
        let build = build_with(&SameRect, &mut store).expect("build");

        assert_eq!(build.artifacts.tiles.len(), 4);
        assert_eq!(build.artifacts.additional.len(), 1);
        let ids: Vec<_> = build.artifacts.tiles.values().map(|t| t.tile_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(
            build.artifacts.region_names(),
            vec![
                "Dungeon_0_16_16_16",
                "Dungeon_16_16_16_16",
                "Dungeon_0_0_16_16",
                "Dungeon_16_0_16_16",
                "Dungeon_0_16_32_16"
            ]
        );
        let tile = build.artifacts.tile(3).expect("tile 3");
        assert_eq!(tile.rect, crate::spatial::PixelRect::new(16, 0, 16, 16));
    }

    #[test]
    fn validator_issues_stop_the_build_before_slicing() {
        let settings = BuildSettings::default();
        let mut store = stale_store();
        let before = store.clone();
        let err = TilesetBuilder::new(&settings)
            .with_validator(&NotASprite)
            .with_slicer(&Crashing)
            .build(&file(&[], &[]), Some(&texture()), &mut store)
            .err()
            .expect("error");
        match err {
            BuildError::TextureIssues { texture, issues } => {
                assert_eq!(texture, "dungeon");
                assert_eq!(
                    issues,
                    vec![TextureIssue::Other("texture type is not Sprite".into())]
                );
            }
            other => panic!("expected TextureIssues, got {other:?}"),
        }
        assert_eq!(store, before);
    }
}
