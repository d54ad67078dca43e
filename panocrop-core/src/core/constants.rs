//! Constants used throughout the crop pipeline.

/// Object classes that pass the detection filter at the lower confidence threshold.
pub const DEFAULT_PRIORITY_CLASSES: &[&str] = &[
    "person", "cat", "dog", "car", "bicycle", "bird", "flower", "tree", "building",
];

/// Minimum polygon area for a saliency contour to become a region.
pub const DEFAULT_SALIENCY_MIN_AREA: f64 = 800.0;

/// Minimum box area (in square pixels) for an object detection to become a region.
pub const DEFAULT_OBJECT_MIN_AREA: i64 = 400;

/// Minimum polygon area for a segmentation contour to become a region.
pub const DEFAULT_SEGMENTATION_MIN_AREA: f64 = 1200.0;

/// Confidence required for detections of a priority class.
pub const DEFAULT_PRIORITY_CONFIDENCE: f32 = 0.4;

/// Confidence required for detections of any other class.
pub const DEFAULT_GENERAL_CONFIDENCE: f32 = 0.6;

/// Number of dominant segmentation classes turned into regions.
pub const DEFAULT_SEGMENTATION_CLASSES: usize = 3;

/// Cell size, in pixels, of the grid used to collapse near-duplicate regions.
pub const DEFAULT_DEDUP_CELL: u32 = 50;

/// Default number of crops returned per image.
pub const DEFAULT_TOP_N: usize = 5;

/// Upper bound on the number of crops a single request may ask for.
pub const MAX_TOP_N: usize = 10;

/// Shortest image side the fallback layout can handle without degenerate regions.
pub const MIN_IMAGE_SIDE: u32 = 3;

/// ImageNet channel means (RGB, 0..1 scale).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB, 0..1 scale).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// CLIP image preprocessing means.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP image preprocessing standard deviations.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Side length of the square input expected by the learned saliency network.
pub const SALIENCY_MODEL_INPUT: u32 = 256;

/// Side length of the square input expected by the segmentation network.
pub const SEGMENTATION_MODEL_INPUT: u32 = 256;

/// Side length of the square input expected by the CLIP vision tower.
pub const CLIP_IMAGE_INPUT: u32 = 224;

/// Token length of the CLIP text tower.
pub const CLIP_CONTEXT_LENGTH: usize = 77;

/// Maximum sequence length of the text scorer.
pub const TEXT_SCORER_MAX_TOKENS: usize = 512;

/// Side length of the square input of the object detector.
pub const DETECTOR_INPUT: u32 = 640;

/// IoU above which overlapping detections of the same class are suppressed.
pub const DETECTOR_NMS_IOU: f32 = 0.45;

/// Objectness below which detector candidates are discarded before NMS.
pub const DETECTOR_MIN_OBJECTNESS: f32 = 0.25;

/// The 80 COCO class names in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Default chat-completions endpoint of the remote advisor.
pub const DEFAULT_ADVISORY_ENDPOINT: &str =
    "https://ark.cn-beijing.volces.com/api/v3/chat/completions";

/// Default vision-language model requested from the remote advisor.
pub const DEFAULT_ADVISORY_MODEL: &str = "doubao-seed-1-6-251015";
