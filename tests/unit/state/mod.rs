pub mod test_serializer;
