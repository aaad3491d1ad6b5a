tonic::include_proto!("remotejobs");
