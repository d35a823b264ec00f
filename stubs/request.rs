
pub fn {name}(data : &[u8]) -> Result<Vec<u8>, Error> {{
    debug!(&format!("REQUEST: {{}}", "{name}"));
    let id : u16 = {id};

    authentic_execution::handle_request(id, data)
}}
