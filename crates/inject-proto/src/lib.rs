pub mod inject {
	tonic::include_proto!("inject");
}
