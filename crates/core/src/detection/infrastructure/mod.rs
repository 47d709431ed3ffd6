pub mod cascade_detector;
pub mod haar_cascade;
pub mod integral_image;
pub mod math;
pub mod opencv_xml;
