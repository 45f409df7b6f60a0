//! The subset of `tensorflow.Event` needed to read scalar summaries.
//! Fields not declared here are skipped by the decoder.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(double, tag = "1")]
    pub wall_time: f64,
    #[prost(int64, tag = "2")]
    pub step: i64,
    #[prost(string, optional, tag = "3")]
    pub file_version: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "5")]
    pub summary: ::core::option::Option<Summary>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Summary {
    #[prost(message, repeated, tag = "1")]
    pub value: ::prost::alloc::vec::Vec<SummaryValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SummaryValue {
    #[prost(string, tag = "1")]
    pub tag: ::prost::alloc::string::String,
    #[prost(float, optional, tag = "2")]
    pub simple_value: ::core::option::Option<f32>,
    #[prost(string, tag = "7")]
    pub node_name: ::prost::alloc::string::String,
}

impl Event {
    pub fn scalar(step: i64, wall_time: f64, tag: &str, value: f32) -> Self {
        Event {
            wall_time,
            step,
            file_version: None,
            summary: Some(Summary {
                value: vec![SummaryValue {
                    tag: tag.to_string(),
                    simple_value: Some(value),
                    node_name: String::new(),
                }],
            }),
        }
    }
}
