mod overwrite;
