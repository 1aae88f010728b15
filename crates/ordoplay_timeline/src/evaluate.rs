// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline evaluation.
//!
//! Evaluation is a pure function of `(timeline, time)`: it knows nothing about
//! bindings, handlers or playback state.

use crate::clip::Clip;
use crate::timeline::Timeline;
use crate::track::Track;

/// State of one track at the evaluated time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    /// Evaluated track
    pub track: &'a Track,
    /// Active clip, if any
    pub clip: Option<&'a Clip>,
    /// Clip-local time; 0 when no clip is active
    pub local_time: f32,
}

impl Sample<'_> {
    /// Whether a clip is active
    pub fn is_active(&self) -> bool {
        self.clip.is_some()
    }
}

/// Result of evaluating a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<'a> {
    /// Time after clamping into `[0, duration]`
    pub time: f32,
    /// One sample per track, in track order
    pub samples: Vec<Sample<'a>>,
}

impl<'a> Evaluation<'a> {
    /// Samples with an active clip
    pub fn active(&self) -> impl Iterator<Item = &Sample<'a>> {
        self.samples.iter().filter(|s| s.is_active())
    }
}

/// Evaluate every track of `timeline` at `time`
pub fn evaluate(timeline: &Timeline, time: f32) -> Evaluation<'_> {
    let time = timeline.clamp_time(time);
    let samples = timeline
        .tracks()
        .iter()
        .map(|track| sample_track(track, time))
        .collect();
    Evaluation { time, samples }
}

/// Sample one track at an already clamped time
pub fn sample_track(track: &Track, time: f32) -> Sample<'_> {
    match track.active_clip(time) {
        Some(clip) => Sample {
            track,
            clip: Some(clip),
            local_time: clip.local_time(time),
        },
        None => Sample {
            track,
            clip: None,
            local_time: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Extrapolation;
    use crate::testing::{approx_eq, scenario_timeline};
    use crate::track::{TrackId, TrackType};

    fn local(evaluation: &Evaluation<'_>, track: TrackId) -> Option<(String, f32)> {
        let sample = evaluation.samples.iter().find(|s| s.track.id() == track)?;
        sample.clip.map(|c| (c.name.clone(), sample.local_time))
    }

    #[test]
    fn test_example_scenario() {
        let (timeline, ids) = scenario_timeline();

        let at_1 = evaluate(&timeline, 1.0);
        assert_eq!(local(&at_1, ids.walk), Some(("Walk".to_string(), 1.0)));
        assert_eq!(local(&at_1, ids.show), None);

        let at_5 = evaluate(&timeline, 5.0);
        assert_eq!(local(&at_5, ids.walk), None);
        assert_eq!(local(&at_5, ids.show), Some(("Show".to_string(), 3.0)));
    }

    #[test]
    fn test_one_sample_per_track() {
        let (timeline, _) = scenario_timeline();
        let evaluation = evaluate(&timeline, 3.0);
        assert_eq!(evaluation.samples.len(), timeline.track_count());
        assert_eq!(evaluation.active().count(), 2);
        let inactive = evaluation.samples.iter().find(|s| !s.is_active()).unwrap();
        assert_eq!(inactive.local_time, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let (timeline, _) = scenario_timeline();
        for t in [0.0, 1.25, 3.999, 7.5, 10.0] {
            assert_eq!(evaluate(&timeline, t), evaluate(&timeline, t));
        }
    }

    #[test]
    fn test_clamps_time() {
        let (timeline, _) = scenario_timeline();
        assert_eq!(evaluate(&timeline, -5.0), evaluate(&timeline, 0.0));
        assert_eq!(evaluate(&timeline, 110.0), evaluate(&timeline, 10.0));
        assert_eq!(evaluate(&timeline, 110.0).time, 10.0);
    }

    #[test]
    fn test_overlap_tie_break() {
        let mut timeline = Timeline::new("Overlap", 10.0, 30.0).unwrap();
        let track = timeline.add_track(Track::new("Lane", TrackType::Custom)).unwrap();
        timeline.add_clip(track, Clip::new("A", 0.0, 5.0).unwrap()).unwrap();
        timeline.add_clip(track, Clip::new("B", 3.0, 5.0).unwrap()).unwrap();

        let evaluation = evaluate(&timeline, 4.0);
        let (name, local_time) = local(&evaluation, track).unwrap();
        assert_eq!(name, "B");
        assert!(approx_eq(local_time, 1.0));
    }

    #[test]
    fn test_extrapolation_applied() {
        let mut timeline = Timeline::new("Loop", 10.0, 30.0).unwrap();
        let track = timeline.add_track(Track::new("Lane", TrackType::Custom)).unwrap();
        let clip = Clip::new("Cycle", 2.0, 8.0)
            .unwrap()
            .with_extrapolation(Extrapolation::PingPong);
        timeline.add_clip(track, clip).unwrap();

        let evaluation = evaluate(&timeline, 10.0);
        let (_, local_time) = local(&evaluation, track).unwrap();
        assert!(approx_eq(local_time, 8.0));
    }
}
