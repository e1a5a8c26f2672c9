use clap::ValueEnum;

use crate::types::{
    FaceLandmarks, GestureLabel, HandLandmarks, INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE_MCP,
    MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP, PINKY_PIP, PINKY_TIP, RING_MCP, RING_PIP, RING_TIP,
    THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
};

// Uncalibrated sensitivities, all in normalized image units.
pub const MOUTH_OPEN_THRESHOLD: f32 = 0.03;
pub const MOUTH_WIDTH_THRESHOLD: f32 = 0.08;
pub const WRIST_SPREAD_THRESHOLD: f32 = 0.4;
pub const PINCH_THRESHOLD: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// (tip, pip, mcp) landmark indices.
    fn joints(&self) -> (usize, usize, usize) {
        match self {
            Finger::Index => (INDEX_TIP, INDEX_PIP, INDEX_MCP),
            Finger::Middle => (MIDDLE_TIP, MIDDLE_PIP, MIDDLE_MCP),
            Finger::Ring => (RING_TIP, RING_PIP, RING_MCP),
            Finger::Pinky => (PINKY_TIP, PINKY_PIP, PINKY_MCP),
        }
    }
}

/// Which decision list the classifier walks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RuleSet {
    /// Face and two-hand poses: laughing, both fists, one finger, wide spread.
    #[default]
    Expressions,
    /// Classic single-hand signs: thumbs up, peace, open palm, fist, ok.
    SingleHand,
}

/// Smaller y is higher in image space, so an extended finger has
/// tip above pip above mcp.
pub fn is_finger_extended(hand: &HandLandmarks, finger: Finger) -> bool {
    let (tip, pip, mcp) = finger.joints();
    let (tip, pip, mcp) = (hand.point(tip), hand.point(pip), hand.point(mcp));
    tip.y < pip.y && pip.y < mcp.y
}

/// The thumb abducts sideways: its tip must sit further from the wrist
/// horizontally than its MCP, and above its IP joint.
pub fn is_thumb_extended(hand: &HandLandmarks) -> bool {
    let wrist = hand.point(WRIST);
    let tip = hand.point(THUMB_TIP);
    let ip = hand.point(THUMB_IP);
    let mcp = hand.point(THUMB_MCP);

    let sideways = (tip.x - wrist.x).abs() > (mcp.x - wrist.x).abs();
    sideways && tip.y < ip.y
}

pub fn extended_fingers(hand: &HandLandmarks) -> Vec<Finger> {
    Finger::ALL
        .iter()
        .copied()
        .filter(|finger| is_finger_extended(hand, *finger))
        .collect()
}

pub fn pinch_distance(hand: &HandLandmarks) -> f32 {
    hand.point(THUMB_TIP).distance_2d(&hand.point(INDEX_TIP))
}

/// Stateless mapping from one frame's landmarks to a gesture label.
#[derive(Clone, Copy, Debug, Default)]
pub struct GestureClassifier {
    rule_set: RuleSet,
}

impl GestureClassifier {
    pub fn new(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }

    pub fn rule_set(&self) -> RuleSet {
        self.rule_set
    }

    pub fn classify(
        &self,
        primary: Option<&HandLandmarks>,
        hands: &[HandLandmarks],
        face: Option<&FaceLandmarks>,
    ) -> GestureLabel {
        match self.rule_set {
            RuleSet::Expressions => classify_expression(primary, hands, face),
            RuleSet::SingleHand => primary.map_or(GestureLabel::None, classify_single_hand),
        }
    }
}

// First match wins; later rules are shadowed when several hold at once.
fn classify_expression(
    primary: Option<&HandLandmarks>,
    hands: &[HandLandmarks],
    face: Option<&FaceLandmarks>,
) -> GestureLabel {
    if let Some(mouth) = face.and_then(FaceLandmarks::mouth) {
        if mouth.opening > MOUTH_OPEN_THRESHOLD && mouth.width > MOUTH_WIDTH_THRESHOLD {
            return GestureLabel::Laughing;
        }
    }

    if hands.len() == 2 && hands.iter().all(|hand| extended_fingers(hand).is_empty()) {
        return GestureLabel::BothFists;
    }

    if let Some(hand) = primary {
        if extended_fingers(hand) == [Finger::Index] {
            return GestureLabel::OneFinger;
        }
    }

    if hands.len() == 2 && hands.iter().all(spread_ready) {
        let spread = (hands[0].wrist().x - hands[1].wrist().x).abs();
        if spread > WRIST_SPREAD_THRESHOLD {
            return GestureLabel::WideSpread;
        }
    }

    GestureLabel::None
}

fn spread_ready(hand: &HandLandmarks) -> bool {
    [Finger::Index, Finger::Middle, Finger::Ring]
        .iter()
        .filter(|finger| is_finger_extended(hand, **finger))
        .count()
        >= 2
}

fn classify_single_hand(hand: &HandLandmarks) -> GestureLabel {
    let fingers = extended_fingers(hand);
    let thumb = is_thumb_extended(hand);

    if thumb && fingers.is_empty() {
        return GestureLabel::ThumbsUp;
    }
    if !thumb && fingers == [Finger::Index, Finger::Middle] {
        return GestureLabel::Peace;
    }
    if fingers.len() >= 4 {
        return GestureLabel::OpenPalm;
    }
    if !thumb && fingers.is_empty() {
        return GestureLabel::Fist;
    }
    if pinch_distance(hand) < PINCH_THRESHOLD && fingers.len() >= 2 {
        return GestureLabel::OkSign;
    }

    GestureLabel::None
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{
        FACE_LOWER_LIP, FACE_MOUTH_LEFT, FACE_MOUTH_RIGHT, FACE_UPPER_LIP, FaceLandmarks,
        HandLandmarks, LandmarkPoint, THUMB_CMC,
    };

    use super::*;

    /// A hand centred on `wrist_x` with every finger curled and the thumb tucked.
    pub fn fist_at(wrist_x: f32) -> HandLandmarks {
        let mut points = [LandmarkPoint::new(wrist_x, 0.8); 21];
        points[THUMB_CMC] = LandmarkPoint::new(wrist_x - 0.02, 0.75);
        points[THUMB_MCP] = LandmarkPoint::new(wrist_x - 0.04, 0.70);
        points[THUMB_IP] = LandmarkPoint::new(wrist_x - 0.03, 0.66);
        points[THUMB_TIP] = LandmarkPoint::new(wrist_x - 0.02, 0.68);
        for (i, finger) in Finger::ALL.iter().enumerate() {
            let x = wrist_x - 0.03 + i as f32 * 0.02;
            let (tip, pip, mcp) = finger.joints();
            points[mcp] = LandmarkPoint::new(x, 0.60);
            points[pip] = LandmarkPoint::new(x, 0.55);
            points[pip + 1] = LandmarkPoint::new(x, 0.58);
            // Curled: the tip drops back below the PIP joint.
            points[tip] = LandmarkPoint::new(x, 0.62);
        }
        HandLandmarks::new(points)
    }

    pub fn with_extended(mut hand: HandLandmarks, fingers: &[Finger]) -> HandLandmarks {
        for finger in fingers {
            let (tip, pip, mcp) = finger.joints();
            let x = hand.points[mcp].x;
            hand.points[pip] = LandmarkPoint::new(x, 0.45);
            hand.points[pip + 1] = LandmarkPoint::new(x, 0.38);
            hand.points[tip] = LandmarkPoint::new(x, 0.30);
        }
        hand
    }

    pub fn with_thumb_out(mut hand: HandLandmarks) -> HandLandmarks {
        let wrist_x = hand.points[WRIST].x;
        hand.points[THUMB_IP] = LandmarkPoint::new(wrist_x - 0.10, 0.60);
        hand.points[THUMB_TIP] = LandmarkPoint::new(wrist_x - 0.14, 0.50);
        hand
    }

    pub fn face_with_mouth(opening: f32, width: f32) -> FaceLandmarks {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); 468];
        points[FACE_UPPER_LIP] = LandmarkPoint::new(0.5, 0.6);
        points[FACE_LOWER_LIP] = LandmarkPoint::new(0.5, 0.6 + opening);
        points[FACE_MOUTH_LEFT] = LandmarkPoint::new(0.5 - width / 2.0, 0.6);
        points[FACE_MOUTH_RIGHT] = LandmarkPoint::new(0.5 + width / 2.0, 0.6);
        FaceLandmarks::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::types::LandmarkPoint;

    fn expressions() -> GestureClassifier {
        GestureClassifier::new(RuleSet::Expressions)
    }

    fn single_hand() -> GestureClassifier {
        GestureClassifier::new(RuleSet::SingleHand)
    }

    #[test]
    fn monotonic_chain_marks_finger_extended() {
        for finger in Finger::ALL {
            let hand = with_extended(fist_at(0.5), &[finger]);
            assert!(is_finger_extended(&hand, finger), "{finger:?}");
        }
    }

    #[test]
    fn breaking_either_inequality_folds_finger() {
        for finger in Finger::ALL {
            let (tip, pip, mcp) = finger.joints();

            // tip no longer above pip
            let mut hand = with_extended(fist_at(0.5), &[finger]);
            hand.points[tip].y = hand.points[pip].y + 0.01;
            assert!(!is_finger_extended(&hand, finger), "{finger:?} tip");

            // pip no longer above mcp
            let mut hand = with_extended(fist_at(0.5), &[finger]);
            hand.points[pip].y = hand.points[mcp].y + 0.01;
            hand.points[tip].y = hand.points[pip].y - 0.05;
            assert!(!is_finger_extended(&hand, finger), "{finger:?} pip");
        }
    }

    #[test]
    fn thumb_needs_sideways_reach_and_tip_above_ip() {
        let hand = with_thumb_out(fist_at(0.5));
        assert!(is_thumb_extended(&hand));

        // sideways reach only
        let mut reach_only = hand.clone();
        reach_only.points[THUMB_TIP].y = reach_only.points[THUMB_IP].y + 0.02;
        assert!(!is_thumb_extended(&reach_only));

        // tip above IP only
        let mut above_only = hand.clone();
        above_only.points[THUMB_TIP].x = above_only.points[WRIST].x - 0.01;
        assert!(!is_thumb_extended(&above_only));
    }

    #[test]
    fn no_inputs_is_neutral() {
        assert_eq!(expressions().classify(None, &[], None), GestureLabel::None);
        assert_eq!(single_hand().classify(None, &[], None), GestureLabel::None);
    }

    #[test]
    fn open_wide_mouth_laughs_without_hands() {
        let face = face_with_mouth(0.05, 0.12);
        assert_eq!(
            expressions().classify(None, &[], Some(&face)),
            GestureLabel::Laughing
        );
    }

    #[test]
    fn narrow_or_closed_mouth_does_not_laugh() {
        let closed = face_with_mouth(0.01, 0.12);
        let narrow = face_with_mouth(0.05, 0.05);
        assert_eq!(
            expressions().classify(None, &[], Some(&closed)),
            GestureLabel::None
        );
        assert_eq!(
            expressions().classify(None, &[], Some(&narrow)),
            GestureLabel::None
        );
    }

    #[test]
    fn laughing_shadows_hand_rules() {
        let hands = [fist_at(0.2), fist_at(0.8)];
        let face = face_with_mouth(0.05, 0.12);
        assert_eq!(
            expressions().classify(hands.first(), &hands, Some(&face)),
            GestureLabel::Laughing
        );
    }

    #[test]
    fn two_fists_far_apart_resolve_to_both_fists() {
        let hands = [fist_at(0.1), fist_at(0.9)];
        let spread = (hands[0].wrist().x - hands[1].wrist().x).abs();
        assert!(spread > WRIST_SPREAD_THRESHOLD);
        assert_eq!(
            expressions().classify(hands.first(), &hands, None),
            GestureLabel::BothFists
        );
    }

    #[test]
    fn single_index_is_one_finger() {
        let hand = with_extended(fist_at(0.5), &[Finger::Index]);
        assert_eq!(
            expressions().classify(Some(&hand), std::slice::from_ref(&hand), None),
            GestureLabel::OneFinger
        );

        let two = with_extended(fist_at(0.5), &[Finger::Index, Finger::Middle]);
        assert_eq!(
            expressions().classify(Some(&two), std::slice::from_ref(&two), None),
            GestureLabel::None
        );
    }

    #[test]
    fn open_hands_far_apart_are_wide_spread() {
        let open = [Finger::Index, Finger::Middle, Finger::Ring];
        let hands = [
            with_extended(fist_at(0.15), &open),
            with_extended(fist_at(0.85), &[Finger::Index, Finger::Middle]),
        ];
        assert_eq!(
            expressions().classify(hands.first(), &hands, None),
            GestureLabel::WideSpread
        );

        let close = [
            with_extended(fist_at(0.4), &open),
            with_extended(fist_at(0.6), &open),
        ];
        assert_eq!(
            expressions().classify(close.first(), &close, None),
            GestureLabel::None
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let hand = with_extended(fist_at(0.5), &[Finger::Index]);
        let face = face_with_mouth(0.02, 0.1);
        let classifier = expressions();
        let first = classifier.classify(Some(&hand), std::slice::from_ref(&hand), Some(&face));
        let second = classifier.classify(Some(&hand), std::slice::from_ref(&hand), Some(&face));
        assert_eq!(first, second);
    }

    #[test]
    fn single_hand_rules_in_order() {
        let classifier = single_hand();

        let thumbs_up = with_thumb_out(fist_at(0.5));
        assert_eq!(
            classifier.classify(Some(&thumbs_up), &[], None),
            GestureLabel::ThumbsUp
        );

        let peace = with_extended(fist_at(0.5), &[Finger::Index, Finger::Middle]);
        assert_eq!(classifier.classify(Some(&peace), &[], None), GestureLabel::Peace);

        let palm = with_thumb_out(with_extended(fist_at(0.5), &Finger::ALL));
        assert_eq!(classifier.classify(Some(&palm), &[], None), GestureLabel::OpenPalm);

        let fist = fist_at(0.5);
        assert_eq!(classifier.classify(Some(&fist), &[], None), GestureLabel::Fist);
    }

    #[test]
    fn pinch_with_two_fingers_is_ok_sign() {
        let mut ok = with_extended(fist_at(0.5), &[Finger::Middle, Finger::Ring, Finger::Pinky]);
        ok = with_thumb_out(ok);
        // index curls down onto the thumb tip
        ok.points[INDEX_TIP] = LandmarkPoint::new(0.40, 0.58);
        ok.points[THUMB_TIP] = LandmarkPoint::new(0.38, 0.57);
        assert!(pinch_distance(&ok) < PINCH_THRESHOLD);
        assert_eq!(single_hand().classify(Some(&ok), &[], None), GestureLabel::OkSign);
    }

    #[test]
    fn pinch_needs_two_extended_fingers() {
        let mut hand = with_extended(fist_at(0.5), &[Finger::Ring]);
        hand = with_thumb_out(hand);
        hand.points[INDEX_TIP] = LandmarkPoint::new(0.40, 0.58);
        hand.points[THUMB_TIP] = LandmarkPoint::new(0.38, 0.57);
        assert_eq!(single_hand().classify(Some(&hand), &[], None), GestureLabel::None);
    }

    #[test]
    fn single_hand_ignores_face() {
        let face = face_with_mouth(0.05, 0.12);
        assert_eq!(
            single_hand().classify(None, &[], Some(&face)),
            GestureLabel::None
        );
    }
}
