pub mod alignment {
    pub mod domain {
        pub mod face_aligner;
    }
}

pub mod detection {
    pub mod domain {
        pub mod eye_locator;
        pub mod face_locator;
        pub mod region_detector;
    }
    pub mod infrastructure;
}

pub mod eye_color {
    pub mod domain {
        pub mod eye_color_classifier;
        pub mod palette;
    }
    pub mod infrastructure;
}

pub mod identification {
    pub mod domain {
        pub mod color_filter;
        pub mod face_recognizer;
        pub mod fusion;
        pub mod gallery_registry;
        pub mod ranked_result;
    }
    pub mod infrastructure;
}

pub mod io {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod align_face_use_case;
    pub mod batch_executor;
    pub mod evaluate_use_case;
    pub mod identify_use_case;
    pub mod infrastructure;
    pub mod pipeline_config;
    pub mod pipeline_logger;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod model_resolver;
}
