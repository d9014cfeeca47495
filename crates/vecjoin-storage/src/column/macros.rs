macro_rules! with_vector_data {
    ($data:expr, | $slots:ident | $body:expr) => {
        match $data {
            VectorData::Long($slots) => $body,
            VectorData::Double($slots) => $body,
            VectorData::Bytes($slots) => $body,
        }
    };
}
