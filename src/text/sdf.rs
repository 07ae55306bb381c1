//! SDF font descriptor parsing and the per-glyph quad emitter (spec §6's
//! BMFont-style format: glyph records, kerning pairs, common block).

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRecord {
    pub id: u32,
    pub atlas_x: u32,
    pub atlas_y: u32,
    pub atlas_w: u32,
    pub atlas_h: u32,
    pub xoffset: f32,
    pub yoffset: f32,
    pub xadvance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonBlock {
    pub line_height: f32,
    pub base: f32,
    pub scale_w: f32,
    pub scale_h: f32,
}

/// A parsed SDF font atlas: glyph records, kerning table, and the common
/// block. Multiple atlas pages are supported by `page_urls`; `glyphs` maps
/// a codepoint to its record on whichever page it lives on (single-page
/// fonts are the common case and are not tracked per-page here).
#[derive(Debug, Clone)]
pub struct SdfFont {
    pub page_urls: Vec<String>,
    pub common: CommonBlock,
    pub glyphs: HashMap<u32, GlyphRecord>,
    kerning: HashMap<(u32, u32), f32>,
}

impl SdfFont {
    pub fn new(page_urls: Vec<String>, common: CommonBlock) -> Self {
        Self {
            page_urls,
            common,
            glyphs: HashMap::new(),
            kerning: HashMap::new(),
        }
    }

    pub fn add_glyph(&mut self, glyph: GlyphRecord) {
        self.glyphs.insert(glyph.id, glyph);
    }

    pub fn add_kerning(&mut self, first: u32, second: u32, amount: f32) {
        self.kerning.insert((first, second), amount);
    }

    pub fn kerning(&self, first: u32, second: u32) -> f32 {
        self.kerning.get(&(first, second)).copied().unwrap_or(0.0)
    }

    /// Missing glyph falls back to `?` (spec §4.5 failure semantics).
    pub fn glyph_or_fallback(&self, codepoint: u32) -> Option<&GlyphRecord> {
        self.glyphs
            .get(&codepoint)
            .or_else(|| self.glyphs.get(&('?' as u32)))
    }

    /// Advance width of `text` at the given pixel font size, including
    /// kerning between consecutive glyphs — the callback the layout engine
    /// measures wrapped lines with.
    pub fn measure(&self, text: &str, font_size: f32, letter_spacing: f32) -> f32 {
        let scale = font_size / self.common.line_height.max(1.0);
        let mut width = 0.0;
        let mut prev: Option<u32> = None;
        for ch in text.chars() {
            let cp = ch as u32;
            let Some(glyph) = self.glyph_or_fallback(cp) else {
                continue;
            };
            if let Some(p) = prev {
                width += self.kerning(p, cp) * scale;
            }
            width += glyph.xadvance * scale + letter_spacing;
            prev = Some(cp);
        }
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_font() -> SdfFont {
        let mut font = SdfFont::new(
            vec!["atlas.png".to_string()],
            CommonBlock {
                line_height: 32.0,
                base: 26.0,
                scale_w: 256.0,
                scale_h: 256.0,
            },
        );
        font.add_glyph(GlyphRecord {
            id: 'a' as u32,
            atlas_x: 0,
            atlas_y: 0,
            atlas_w: 16,
            atlas_h: 20,
            xoffset: 0.0,
            yoffset: 0.0,
            xadvance: 16.0,
        });
        font.add_glyph(GlyphRecord {
            id: 'v' as u32,
            atlas_x: 20,
            atlas_y: 0,
            atlas_w: 16,
            atlas_h: 20,
            xoffset: 0.0,
            yoffset: 0.0,
            xadvance: 14.0,
        });
        font.add_glyph(GlyphRecord {
            id: '?' as u32,
            atlas_x: 40,
            atlas_y: 0,
            atlas_w: 16,
            atlas_h: 20,
            xoffset: 0.0,
            yoffset: 0.0,
            xadvance: 16.0,
        });
        font.add_kerning('a' as u32, 'v' as u32, -2.0);
        font
    }

    #[test]
    fn missing_glyph_falls_back_to_question_mark() {
        let font = test_font();
        let glyph = font.glyph_or_fallback('z' as u32).unwrap();
        assert_eq!(glyph.id, '?' as u32);
    }

    #[test]
    fn measure_applies_kerning_between_glyphs() {
        let font = test_font();
        let with_kerning = font.measure("av", 32.0, 0.0);
        let without_kerning_equivalent = font.measure("aa", 32.0, 0.0);
        assert!(with_kerning < without_kerning_equivalent);
    }
}
