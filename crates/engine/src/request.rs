//! Pure transforms from wizard form state to wire request shapes.
//!
//! The builders assume validated input and never fail on well-formed
//! [`FormData`]; no validation happens here. Optional blocks follow the
//! backend's conditional-inclusion rules: the brand block exists only when
//! a brand name was provided, CTA text only when the CTA flag is set, and
//! the secondary color travels as a singleton list only when non-empty.

use reelgen_types::{
    BrandParameters, ClipPromptRequest, CreateGenerationRequest, FormData, GenerationOptions, GenerationParameters,
    MusicStyle, clip_plan,
};

/// Flatten the nested wizard fields into the create-generation wire shape.
pub fn build_request(data: &FormData) -> CreateGenerationRequest {
    let brand_name = data.brand_name.trim();
    let brand = if brand_name.is_empty() {
        None
    } else {
        let secondary = data.brand_colors.secondary.trim();
        Some(BrandParameters {
            name: brand_name.to_string(),
            primary_color: data.brand_colors.primary.trim().to_string(),
            secondary_colors: if secondary.is_empty() { Vec::new() } else { vec![secondary.to_string()] },
        })
    };

    CreateGenerationRequest {
        prompt: data.concept.trim().to_string(),
        parameters: GenerationParameters {
            duration_seconds: data.duration_seconds,
            aspect_ratio: data.aspect_ratio,
            style: data.style,
            brand,
            include_cta: data.include_cta.then_some(true),
            cta_text: data.include_cta.then(|| data.cta_text.trim().to_string()),
            music_style: match data.music_style {
                MusicStyle::None => None,
                other => Some(other),
            },
        },
        options: GenerationOptions {
            quality: data.quality,
            fast_generation: data.fast_generation,
            parallelize_generations: data.parallelize,
        },
    }
}

/// Build the clip-prompt request for the wizard's concept, deriving the clip
/// plan from the requested duration.
pub fn build_clip_prompt_request(data: &FormData) -> ClipPromptRequest {
    let (num_clips, clip_length) = clip_plan(data.duration_seconds);
    ClipPromptRequest {
        prompt: data.concept.trim().to_string(),
        num_clips,
        clip_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_types::Quality;

    fn base_form() -> FormData {
        FormData {
            concept: "  a trail running shoe splashing through mud  ".into(),
            ..FormData::default()
        }
    }

    #[test]
    fn brand_block_absent_without_brand_name() {
        let request = build_request(&base_form());
        assert!(request.parameters.brand.is_none());
        assert_eq!(request.prompt, "a trail running shoe splashing through mud");
    }

    #[test]
    fn brand_block_present_with_brand_name() {
        let mut data = base_form();
        data.brand_name = "Summit Shoes".into();
        data.brand_colors.primary = "#1A2B3C".into();

        let brand = build_request(&data).parameters.brand.unwrap();
        assert_eq!(brand.name, "Summit Shoes");
        assert_eq!(brand.primary_color, "#1A2B3C");
        assert!(brand.secondary_colors.is_empty());
    }

    #[test]
    fn secondary_color_wrapped_in_singleton_list() {
        let mut data = base_form();
        data.brand_name = "Summit Shoes".into();
        data.brand_colors.primary = "#1A2B3C".into();
        data.brand_colors.secondary = "#F0E0D0".into();

        let brand = build_request(&data).parameters.brand.unwrap();
        assert_eq!(brand.secondary_colors, vec!["#F0E0D0".to_string()]);
    }

    #[test]
    fn cta_text_included_only_when_flag_set() {
        let mut data = base_form();
        data.cta_text = "Shop now".into();

        let request = build_request(&data);
        assert_eq!(request.parameters.include_cta, None);
        assert_eq!(request.parameters.cta_text, None);

        data.include_cta = true;
        let request = build_request(&data);
        assert_eq!(request.parameters.include_cta, Some(true));
        assert_eq!(request.parameters.cta_text.as_deref(), Some("Shop now"));
    }

    #[test]
    fn no_music_choice_is_omitted_from_the_wire() {
        let mut data = base_form();
        data.music_style = MusicStyle::None;
        assert_eq!(build_request(&data).parameters.music_style, None);

        data.music_style = MusicStyle::Ambient;
        assert_eq!(build_request(&data).parameters.music_style, Some(MusicStyle::Ambient));
    }

    #[test]
    fn options_carry_review_step_choices() {
        let mut data = base_form();
        data.quality = Quality::High;
        data.parallelize = true;

        let options = build_request(&data).options;
        assert_eq!(options.quality, Quality::High);
        assert!(options.parallelize_generations);
        assert!(!options.fast_generation);
    }

    #[test]
    fn clip_plan_for_thirty_seconds_stays_in_bounds() {
        let mut data = base_form();
        data.duration_seconds = 30;

        let request = build_clip_prompt_request(&data);
        assert!((3..=10).contains(&request.num_clips));
        assert!((3..=10).contains(&request.clip_length));
        assert!((request.num_clips * request.clip_length).abs_diff(30) <= 5);
    }
}
